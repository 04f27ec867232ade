//! Query-engine subprocess supervisor.

use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::engine::preempt::PortPreempt;

/// Start the query engine and hold it until `shutdown` fires, then kill it.
///
/// Outside production the playground surface is enabled and any stale process
/// bound to the engine port is preempted first.
pub async fn run(
    shutdown: CancellationToken,
    config: &Config,
    preempt: PortPreempt,
) -> Result<(), std::io::Error> {
    let mut cmd = Command::new(&config.query_engine_path);
    cmd.arg("--datamodel-path").arg(&config.schema_file);
    if !config.production {
        preempt.preempt(&config.query_engine_port).await;
        cmd.arg("--enable-playground")
            .arg("--port")
            .arg(&config.query_engine_port);
    }
    cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());

    let mut child = cmd.spawn()?;
    tracing::info!(
        path = %config.query_engine_path,
        port = %config.query_engine_port,
        "query engine started"
    );

    shutdown.cancelled().await;

    if let Err(err) = child.kill().await {
        tracing::warn!(error = %err, "kill query engine");
    }
    tracing::info!("query engine stopped");
    Ok(())
}
