mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pagelens")]
#[command(about = "Annotate web pages with ad, link, form and hidden-element insights", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a page and report every classified element
    Scan {
        /// File path, URL, or `-` for stdin
        target: String,

        /// Output format (text, json, html)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Watch an HTML file, rescanning on every change (long-running)
    Watch {
        /// File to watch
        file: String,
    },

    /// Inspect the elements matching a selector
    Inspect {
        /// File path, URL, or `-` for stdin
        target: String,

        /// CSS selector group
        selector: String,

        /// Ask the local model for an insight on each element
        #[arg(long)]
        ai: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage Look Out watch criteria
    #[command(alias = "lo")]
    Lookout {
        #[command(subcommand)]
        command: LookoutCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Run environment diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum LookoutCommands {
    /// Add a watch criterion
    Add {
        /// Criterion kind (job, product, content)
        #[arg(long)]
        kind: String,

        /// Required keywords, comma-separated
        #[arg(long)]
        keywords: String,

        /// Disqualifying keywords, comma-separated
        #[arg(long)]
        exclude: Option<String>,

        /// Preferred location (informational, used in AI prompts)
        #[arg(long)]
        location: Option<String>,

        /// Minimum salary for job criteria
        #[arg(long)]
        salary_min: Option<f64>,

        /// Maximum price for product criteria
        #[arg(long)]
        price_max: Option<f64>,
    },

    /// List all criteria
    List,

    /// Remove a criterion by id
    Remove {
        /// Criterion id (prefix match)
        id: String,
    },

    /// Run the matcher against a page right now
    Scan {
        /// File path, URL, or `-` for stdin
        target: String,
    },

    /// Enable or disable background watching
    Enable {
        /// Disable instead of enable
        #[arg(long)]
        disable: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the full configuration
    Show,
    /// Get a config value by dot-separated key (e.g. settings.aiEnabled)
    Get {
        /// Config key path (e.g. "settings.detectAds", "tuning.lookoutThreshold")
        key: String,
    },
    /// Set a config value by dot-separated key
    Set {
        /// Config key path
        key: String,
        /// Value to set (auto-detects JSON types)
        value: String,
    },
    /// Reset config to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Scan {
            target,
            format,
            output,
        } => {
            commands::scan::run(&target, &format, output).await?;
        }
        Commands::Watch { file } => {
            commands::watch_cmd::run(&file).await?;
        }
        Commands::Inspect {
            target,
            selector,
            ai,
            json,
        } => {
            commands::inspect::run(&target, &selector, ai, json).await?;
        }
        Commands::Lookout { command } => match command {
            LookoutCommands::Add {
                kind,
                keywords,
                exclude,
                location,
                salary_min,
                price_max,
            } => {
                commands::lookout_cmd::add(&kind, &keywords, exclude, location, salary_min, price_max)
                    .await?;
            }
            LookoutCommands::List => {
                commands::lookout_cmd::list().await?;
            }
            LookoutCommands::Remove { id } => {
                commands::lookout_cmd::remove(&id).await?;
            }
            LookoutCommands::Scan { target } => {
                commands::lookout_cmd::scan(&target).await?;
            }
            LookoutCommands::Enable { disable } => {
                commands::lookout_cmd::enable(!disable).await?;
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::config_cmd::show().await?;
            }
            ConfigCommands::Get { key } => {
                commands::config_cmd::get(&key).await?;
            }
            ConfigCommands::Set { key, value } => {
                commands::config_cmd::set(&key, &value).await?;
            }
            ConfigCommands::Reset { force } => {
                commands::config_cmd::reset(force).await?;
            }
        },
        Commands::Doctor => {
            commands::doctor::run().await?;
        }
    }

    Ok(())
}
