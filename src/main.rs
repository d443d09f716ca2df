use clap::{Args, Parser, Subcommand};
use policy_chat::Result;
use policy_chat::commands::{Overrides, ingest_only, serve, show_config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "policy-chat")]
#[command(about = "Answers HR policy questions from a PDF handbook over HTTP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the policy document and start the HTTP server
    Serve {
        #[command(flatten)]
        document: DocumentArgs,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run ingestion once and report the result
    Ingest {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Show the effective configuration
    Config {
        /// Directory containing config.toml
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DocumentArgs {
    /// Path to the policy PDF
    #[arg(long)]
    document: Option<PathBuf>,
    /// Directory containing config.toml
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

impl DocumentArgs {
    fn into_overrides(self, port: Option<u16>) -> Overrides {
        Overrides {
            config_dir: self.config_dir,
            document: self.document,
            port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { document, port } => {
            serve(&document.into_overrides(port)).await?;
        }
        Commands::Ingest { document } => {
            ingest_only(&document.into_overrides(None)).await?;
        }
        Commands::Config { config_dir } => {
            show_config(&Overrides {
                config_dir,
                ..Overrides::default()
            })?;
        }
    }

    Ok(())
}
