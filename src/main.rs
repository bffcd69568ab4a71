use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod build;
mod commands;
mod config;
mod extension;
mod theme;
mod util;

use config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: FolioCommand,
}

/// Kind of document created by `folio new`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum NewKind {
    Post,
    Page,
}

#[derive(Parser)]
struct NewArgs {
    /// Whether to create a dated post or a standalone page
    #[arg(value_enum)]
    kind: NewKind,

    /// Title of the new document
    title: String,

    /// The path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// The port to bind to (defaults to `dev.port` from the config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Open the site in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,

    /// The path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: Option<PathBuf>,

    /// Whether to watch for changes and rebuild automatically
    #[arg(short, long, default_value = "true", action = clap::ArgAction::Set)]
    watch: bool,
}

#[derive(Subcommand)]
enum FolioCommand {
    /// Create a new post or page
    New(NewArgs),

    /// Build the site
    Build(BuildArgs),

    /// Build, serve and rebuild the site on a local port
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "folio=info".into()))
        .with(fmt::layer().with_target(false))
        .init();

    let args = Args::parse();

    match args.command {
        FolioCommand::New(args) => {
            commands::new::run(&args)?;
        }
        FolioCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        FolioCommand::Serve(args) => {
            commands::serve::run(&args).await?;
        }
    }

    Ok(())
}
