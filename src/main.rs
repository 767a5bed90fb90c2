use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use marketpulse::cli::{self, Cli};
use marketpulse::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli::execute(cli, config).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            error!("Run finished without usable results");
            std::process::exit(1);
        }
        Err(err) => {
            error!(error = %err, "Command failed");
            Err(err)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("marketpulse=info,warn"));

    // JSON lines on stdout so a scheduler's log collector can parse them.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
