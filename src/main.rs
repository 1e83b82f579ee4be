use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fiatfolio::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Value portfolios at current rates
    Value,
    /// Value portfolios at current and 24h-ago rates
    Change,
    /// Display the raw market ticker snapshot
    Tickers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Value) => fiatfolio::valuation::run_value(config_path).await,
        Some(Commands::Change) => fiatfolio::valuation::run_change(config_path).await,
        Some(Commands::Tickers) => fiatfolio::valuation::run_tickers(config_path).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = fiatfolio::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
portfolios:
  - name: "Example"
    holdings:
      - symbol: "BTC"
        amount: 0.5

providers:
  buda:
    base_url: "https://www.buda.com"

fiat: "CLP"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
