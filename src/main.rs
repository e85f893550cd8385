//! Document Store Lifecycle - Main entry point.
//!
//! Loads model definitions, prints the resulting registry and optionally connects
//! to the configured store.

use docstore_lifecycle::config::Cli;
use docstore_lifecycle::db::StoreDriver;
use docstore_lifecycle::{Store, StoreConfigInput};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[cfg(not(feature = "mongodb"))]
use docstore_lifecycle::db::MemoryDriver as Driver;
#[cfg(feature = "mongodb")]
use docstore_lifecycle::db::MongoDriver as Driver;

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

async fn run_store<D: StoreDriver>(
    cli: &Cli,
    input: StoreConfigInput,
    driver: D,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = Store::new(cli.name.clone(), driver).with_root(cli.root_dir());

    let report = store.init(input)?;
    for skipped in &report.skipped {
        warn!(
            path = %skipped.path.display(),
            reason = ?skipped.reason,
            "Model skipped"
        );
    }

    println!("Models ({}):", store.models().len());
    for (name, model) in store.models() {
        println!(
            "  {:<24} collection={:<24} fields={}",
            name,
            model.collection(),
            model.schema().fields().len()
        );
    }

    if cli.connect {
        let connection = store.run().await?;
        println!(
            "Connected: {} (database: {})",
            connection.url,
            connection.database.as_deref().unwrap_or("-")
        );
        store.close().await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let cli = Cli::parse_args();

    // Initialize logging
    init_tracing(&cli);

    info!(
        store = %cli.name,
        "Starting docstore-lifecycle v{}",
        env!("CARGO_PKG_VERSION")
    );

    let input = cli.resolve_input()?;

    if let Err(e) = run_store(&cli, input, Driver::new()).await {
        error!(error = %e, "Store error");
        return Err(e);
    }

    info!("Done");
    Ok(())
}
