use clap::Parser;
use tracing::{debug, warn};

use portal_cli::cli::Cli;
use portal_cli::config::PortalConfig;
use portal_cli::{app, logging};

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging("info");

    let mut config = PortalConfig::load(&cli.config)?;
    config.apply(cli.overrides());

    // RUST_LOG wins over both the file and --log-level.
    if std::env::var_os("RUST_LOG").is_none() {
        logging::set_log_level(&config.logging.level)?;
    }
    if let Some(path) = &config.logging.file {
        if let Err(e) = logging::enable_file_logging(path) {
            warn!("{e:#}");
        }
    }
    debug!(config = %cli.config.display(), "loaded configuration");

    let output = app::run(&cli.command, &config).await?;
    println!("{output}");

    Ok(())
}
