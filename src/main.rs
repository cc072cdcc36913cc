use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil::config::Config;
use vigil::services::{SignalDb, SignalGenerator};
use vigil::sources::GateIoClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let scheduled = std::env::args().any(|arg| arg == "--scheduled");

    // Missing credentials abort startup
    let config = Config::from_env()?;
    info!(
        symbols = config.symbols.len(),
        database = %config.database_path,
        scheduled,
        "starting vigil"
    );

    let db = Arc::new(SignalDb::new(&config.database_path)?);

    let exchange = GateIoClient::new();
    match exchange.server_time().await {
        Ok(server_time) => info!(server_time, "exchange reachable"),
        Err(e) => warn!(error = %e, "exchange preflight failed, continuing anyway"),
    }

    let generator = Arc::new(SignalGenerator::new(exchange, db, &config));

    if scheduled {
        generator.run_scheduled().await;
    } else {
        let summary = generator.run_once().await;
        info!(
            succeeded = summary.succeeded,
            attempted = summary.attempted,
            strong = summary.strong.len(),
            "run finished"
        );
    }

    Ok(())
}
