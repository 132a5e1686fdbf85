use std::sync::Arc;

use {
    clap::Parser,
    secrecy::ExposeSecret,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    gatehouse_store::{ChannelRequirements, LinkStore},
    gatehouse_telegram::BotConfig,
};

#[derive(Parser)]
#[command(name = "gatehouse", about = "Gatehouse — subscription-gated group access bot")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Explicit config file (overrides discovery).
    #[arg(long, env = "GATEHOUSE_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match &cli.config {
        Some(path) => gatehouse_config::load_config(path)?,
        None => gatehouse_config::discover_and_load(),
    };

    if config.telegram.token.expose_secret().is_empty() {
        anyhow::bail!(
            "no bot token configured; set telegram.token in {}",
            gatehouse_config::find_or_default_config_path().display()
        );
    }

    let links = Arc::new(LinkStore::open(&config.storage.links_path));
    let channels = Arc::new(ChannelRequirements::open(&config.storage.channels_path));

    let cancel =
        gatehouse_telegram::bot::start(BotConfig::from(config.telegram), links, channels).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    cancel.cancel();

    Ok(())
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
