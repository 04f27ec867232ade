//! Gateway configuration.
//!
//! Every knob is environment-bound with a default, so the binary runs bare in
//! development and is driven entirely by env vars in deployment.

use clap::Parser;

/// Runtime configuration for the gateway and the engines it supervises.
#[derive(Debug, Clone, Parser)]
#[command(name = "graphbase", about = "GraphQL gateway supervising a local query engine")]
pub struct Config {
    /// Disable the playground and port preemption.
    #[arg(long, env = "PRODUCTION", action = clap::ArgAction::Set, default_value_t = false)]
    pub production: bool,

    /// Schema definition handed to both engines.
    #[arg(long, env = "SCHEMA_FILE", default_value = "./schema.graphql")]
    pub schema_file: String,

    /// Persisted schema digest, used to skip re-migration.
    #[arg(long, env = "SCHEMA_DIGEST_FILE", default_value = "migration.lock")]
    pub schema_digest_file: String,

    /// Shut the gateway down after a quiet period.
    #[arg(long, env = "ENABLE_SLEEP_MODE", action = clap::ArgAction::Set, default_value_t = true)]
    pub enable_sleep_mode: bool,

    /// Quiet period, in seconds, before idle shutdown.
    #[arg(long, env = "SLEEP_AFTER_SECONDS", default_value_t = 10)]
    pub sleep_after_seconds: u64,

    /// Migration engine binary.
    #[arg(long, env = "MIGRATION_ENGINE_PATH", default_value = "./migration-engine")]
    pub migration_engine_path: String,

    /// Query engine binary.
    #[arg(long, env = "QUERY_ENGINE_PATH", default_value = "./query-engine")]
    pub query_engine_path: String,

    /// Local port the query engine listens on.
    #[arg(long, env = "QUERY_ENGINE_PORT", default_value = "4467")]
    pub query_engine_port: String,

    /// Address the gateway listens on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:4466")]
    pub listen_addr: String,

    /// Paced admission rate for all requests, per second.
    #[arg(long, env = "READ_LIMIT_RPS", default_value_t = 10_000)]
    pub read_limit_rps: u32,

    /// Paced admission rate for mutations, per second.
    #[arg(long, env = "WRITE_LIMIT_RPS", default_value_t = 2_000)]
    pub write_limit_rps: u32,

    /// Path answering a fixed OK for liveness probes.
    #[arg(long, env = "HEALTH_ENDPOINT", default_value = "/health")]
    pub health_endpoint: String,
}

impl Config {
    /// Base URL of the query engine's HTTP endpoint.
    pub fn query_engine_url(&self) -> String {
        format!("http://localhost:{}/", self.query_engine_port)
    }

    /// URL of the engine's schema-definition endpoint.
    pub fn query_engine_sdl_url(&self) -> String {
        format!("http://localhost:{}/sdl", self.query_engine_port)
    }
}
