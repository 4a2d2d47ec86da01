mod cli;
mod core;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::config::AppConfig;

#[derive(Parser)]
#[command(name = "csq", about = "Usage quota and notification CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format (text|json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch usage and show the active notification
    Status(cli::status_cmd::StatusArgs),
    /// Show tier limits and upgrade multipliers
    Tiers,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "falling back to default config");
            AppConfig::default()
        }
    };

    let format = if cli.json {
        cli::output::OutputFormat::Json
    } else {
        cli.format
            .as_deref()
            .or(Some(config.settings.default_format.as_str()))
            .and_then(cli::output::OutputFormat::parse)
            .unwrap_or(cli::output::OutputFormat::Text)
    };
    let output_opts = cli::output::OutputOptions {
        format,
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &config.settings.color),
    };

    match cli.command {
        None => {
            cli::status_cmd::run(Default::default(), &config, &output_opts).await?;
        }
        Some(Commands::Status(args)) => {
            cli::status_cmd::run(args, &config, &output_opts).await?;
        }
        Some(Commands::Tiers) => cli::tiers_cmd::run(&config, &output_opts)?,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
        },
    }

    Ok(())
}
