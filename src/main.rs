use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedbase::{DEFAULT_DATABASE_PATH, Migrator, MigratorConfig};

/// Rebuild the local fixture database from scratch.
#[derive(Parser)]
#[command(name = "seedbase")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file, deleted and recreated on every run
    #[arg(long, default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Also insert sample accounts linked to the seeded currencies
    #[arg(long)]
    with_fixtures: bool,
}

/// Initialize tracing with the SEEDBASE_LOG environment variable.
///
/// Defaults to "info" level if SEEDBASE_LOG is not set.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("SEEDBASE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = MigratorConfig::new(&cli.database).with_extended_fixtures(cli.with_fixtures);
    let report = Migrator::from_config(config)
        .run()
        .await
        .with_context(|| format!("failed to build fixture database {}", cli.database.display()))?;

    for (table, rows) in &report.row_counts {
        tracing::info!(%table, rows, "table ready");
    }
    Ok(())
}
