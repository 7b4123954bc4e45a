//! Vigil Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - VIGIL_HOST: Bind address (default: 0.0.0.0)
//! - VIGIL_PORT: Port number (default: 9000)
//! - VIGIL_ALERTER_IDENTIFIER: Key prefix used by the alerters (default: empty)
//! - VIGIL_DB_NAME: Document store database (default: panicdb)
//! - VIGIL_REQUEST_TIMEOUT_SECS: Upper bound on each store call (default: 10)
//! - VIGIL_STORE_CHECK_INTERVAL_SECS: Store health check interval (default: 30)
//! - VIGIL_KV_SNAPSHOT / VIGIL_DOC_SNAPSHOT: Optional JSON files to seed the stores
//! - RUST_LOG: Log level (default: info)

use vigil::api::{run_server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    tracing::info!("Vigil configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!("  Alerter identifier: {:?}", config.alerter_identifier);
    tracing::info!("  Database: {}", config.database);
    tracing::info!("  Request timeout: {} seconds", config.request_timeout_secs);
    tracing::info!(
        "  Store check interval: {} seconds",
        config.store_check_interval_secs
    );
    match &config.key_value_snapshot {
        Some(path) => tracing::info!("  Key-value snapshot: {}", path.display()),
        None => tracing::info!("  Key-value snapshot: none (empty store)"),
    }
    match &config.document_snapshot {
        Some(path) => tracing::info!("  Document snapshot: {}", path.display()),
        None => tracing::info!("  Document snapshot: none (empty store)"),
    }

    println!(
        r#"
 __     ___       _ _
 \ \   / (_) __ _(_) |
  \ \ / /| |/ _` | | |
   \ V / | | (_| | | |
    \_/  |_|\__, |_|_|
            |___/

 Alert & Metrics Aggregation
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(config).await
}
