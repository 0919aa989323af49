use clap::{Parser, Subcommand};
use logpulse::cli::run::RunArgs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logpulse")]
#[command(about = "Tail a log file and turn new lines into metrics", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one tailing pass over a log file
    Run {
        /// Log file to tail
        file: PathBuf,

        /// Parser name from the config's `parsers` map
        #[arg(long)]
        parser: String,

        /// State key for this stream (defaults to one derived from the
        /// parser name and file path)
        #[arg(long)]
        key: Option<String>,

        /// Override the configured state directory
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a sample config file
    Init {
        #[arg(long)]
        stdout: bool,
    },
    /// Check that the config file loads and validates
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logpulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = logpulse::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Run {
            file,
            parser,
            key,
            state_dir,
        } => {
            logpulse::cli::run::run_once(
                config_path,
                RunArgs {
                    file,
                    parser,
                    key,
                    state_dir,
                },
            )
            .await
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => logpulse::cli::config::init(stdout),
            ConfigAction::Validate => logpulse::cli::config::validate(config_path),
        },
    }
}
