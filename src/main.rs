//! graphbase
//!
//! A supervising GraphQL gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                    GRAPHBASE                      │
//!                    │                                                   │
//!   Client Request   │  ┌────────┐   ┌─────────┐   ┌────────────────┐   │
//!   ─────────────────┼─▶│  http  │──▶│ gateway │──▶│ admission +    │   │
//!                    │  │ server │   │ handler │   │ retrying proxy │───┼──▶ query engine
//!                    │  └────────┘   └────┬────┘   └────────────────┘   │    (subprocess)
//!                    │                    │                             │
//!                    │         activity   │   IntrospectionQuery        │
//!                    │                    ▼                             │
//!                    │  ┌───────────┐  ┌──────────┐  ┌──────────────┐   │
//!                    │  │ lifecycle │  │ graphql  │  │   migrate    │───┼──▶ migration engine
//!                    │  │ idle+stop │  │ synth    │  │ (boot, once) │   │    (subprocess)
//!                    │  └───────────┘  └──────────┘  └──────────────┘   │
//!                    └──────────────────────────────────────────────────┘
//! ```
//!
//! One cancellation token stops the listener, the idle timer and the engine
//! subprocess together; main waits for all of them before exiting.

use std::path::Path;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graphbase::config::Config;
use graphbase::engine::{self, PortPreempt};
use graphbase::http::HttpServer;
use graphbase::lifecycle::Shutdown;
use graphbase::migrate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphbase=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    tracing::info!(
        listen_addr = %config.listen_addr,
        engine_port = %config.query_engine_port,
        sleep_mode = config.enable_sleep_mode,
        production = config.production,
        "configuration loaded"
    );

    let schema = std::fs::read_to_string(&config.schema_file)?;

    // Migration runs to completion, success or engine-reported failure,
    // before the gateway serves a single request.
    migrate::apply(
        &config.migration_engine_path,
        &schema,
        &config.schema_file,
        Path::new(&config.schema_digest_file),
    )
    .await?;

    let shutdown = Shutdown::new();

    let engine_config = config.clone();
    let engine_token = shutdown.token();
    shutdown.spawn(async move {
        let preempt = PortPreempt::for_platform();
        if let Err(err) = engine::run(engine_token.clone(), &engine_config, preempt).await {
            tracing::error!(error = %err, "query engine failed to start");
            engine_token.cancel();
        }
    });

    // Ctrl-C is the administrative shutdown trigger.
    let admin_token = shutdown.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            admin_token.cancel();
        }
    });

    let listener = TcpListener::bind(&config.listen_addr).await?;
    let server = HttpServer::new(&config, shutdown.token())?;
    let served = server.run(listener, shutdown.token()).await;

    // The listener has closed; make sure the supervisor follows, then wait
    // for it before exiting.
    shutdown.trigger();
    shutdown.wait().await;
    served?;

    tracing::info!("shutdown complete");
    Ok(())
}
