//! Drives the migration engine through the one-shot `schemaPush` exchange.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::migrate::lock::SchemaDigest;

/// Wall-clock bound on the whole engine exchange.
const ENGINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Digest matched the persisted one; the engine was never started.
    Skipped,
    /// The engine acknowledged the push, or produced no verdict before the
    /// deadline; either way the digest was persisted.
    Applied,
    /// The engine reported an error; the digest was left untouched.
    Failed,
}

/// Fatal protocol or environment failures. Anything here aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("spawn migration engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("migration engine stdio pipe unavailable")]
    Pipe,
    #[error("serialize migration request: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("write migration request: {0}")]
    WriteRequest(#[source] std::io::Error),
    #[error("malformed migration response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("persist schema digest: {0}")]
    PersistDigest(#[source] std::io::Error),
}

#[derive(Debug, Serialize)]
struct MigrationRequest<'a> {
    id: u32,
    jsonrpc: &'static str,
    method: &'static str,
    params: MigrationParams<'a>,
}

#[derive(Debug, Serialize)]
struct MigrationParams<'a> {
    force: bool,
    schema: &'a str,
}

#[derive(Debug, Deserialize)]
struct MigrationResponse {
    result: Option<MigrationResult>,
    error: Option<MigrationEngineError>,
}

#[derive(Debug, Deserialize)]
struct MigrationResult {
    #[serde(rename = "executedSteps")]
    executed_steps: u32,
}

#[derive(Debug, Deserialize)]
struct MigrationEngineError {
    code: i64,
    message: String,
    data: MigrationErrorData,
}

#[derive(Debug, Deserialize)]
struct MigrationErrorData {
    is_panic: bool,
    message: String,
    meta: MigrationErrorMeta,
}

#[derive(Debug, Deserialize)]
struct MigrationErrorMeta {
    full_error: String,
}

/// Push `schema` through the migration engine unless the persisted digest at
/// `digest_path` already matches it.
pub async fn apply(
    engine_path: &str,
    schema: &str,
    schema_path: &str,
    digest_path: &Path,
) -> Result<MigrationOutcome, MigrateError> {
    let digest = SchemaDigest::of(schema);
    if digest.matches_persisted(digest_path) {
        tracing::info!("schema unchanged since last migration, skipping");
        return Ok(MigrationOutcome::Skipped);
    }

    let mut child = Command::new(engine_path)
        .arg("--datamodel")
        .arg(schema_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(MigrateError::Spawn)?;
    let mut stdin = child.stdin.take().ok_or(MigrateError::Pipe)?;
    let stdout = child.stdout.take().ok_or(MigrateError::Pipe)?;

    let outcome = exchange(&mut stdin, stdout, schema, &digest, digest_path).await;

    if let Err(err) = child.kill().await {
        tracing::debug!(error = %err, "migration engine already exited");
    }
    outcome
}

/// The single request/response round-trip. Separated so the caller can kill
/// the child on every exit path.
async fn exchange(
    stdin: &mut tokio::process::ChildStdin,
    stdout: tokio::process::ChildStdout,
    schema: &str,
    digest: &SchemaDigest,
    digest_path: &Path,
) -> Result<MigrationOutcome, MigrateError> {
    let request = MigrationRequest {
        id: 1,
        jsonrpc: "2.0",
        method: "schemaPush",
        params: MigrationParams {
            force: true,
            schema,
        },
    };
    let mut line = serde_json::to_string(&request).map_err(MigrateError::Serialize)?;
    line.push('\n');
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(MigrateError::WriteRequest)?;
    stdin.flush().await.map_err(MigrateError::WriteRequest)?;

    // One newline-terminated message is the whole protocol.
    let mut reader = BufReader::new(stdout);
    let mut response = String::new();
    match tokio::time::timeout(ENGINE_TIMEOUT, reader.read_line(&mut response)).await {
        Ok(Ok(n)) if n > 0 => {
            let parsed: MigrationResponse = serde_json::from_str(response.trim_end())
                .map_err(MigrateError::MalformedResponse)?;
            match parsed.error {
                None => {
                    let steps = parsed.result.map(|r| r.executed_steps).unwrap_or(0);
                    tracing::info!(executed_steps = steps, "migration applied, recording digest");
                    digest.persist(digest_path).map_err(MigrateError::PersistDigest)?;
                    Ok(MigrationOutcome::Applied)
                }
                Some(err) => {
                    tracing::error!(
                        code = err.code,
                        message = %err.message,
                        is_panic = err.data.is_panic,
                        detail = %err.data.message,
                        full_error = %err.data.meta.full_error,
                        "migration engine reported an error"
                    );
                    Ok(MigrationOutcome::Failed)
                }
            }
        }
        // EOF, read error, or deadline: no verdict. Record the digest anyway
        // so a flaky engine does not force a migration attempt on every boot;
        // the gateway starts against a possibly-unmigrated schema.
        Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
            tracing::warn!("migration engine produced no response, recording digest anyway");
            digest.persist(digest_path).map_err(MigrateError::PersistDigest)?;
            Ok(MigrationOutcome::Applied)
        }
    }
}
