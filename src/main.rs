//! CLI entry point for cms-backend

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cms-backend")]
#[command(author = "Yukang Chen")]
#[command(version = "0.1.0")]
#[command(about = "A schema-driven markdown content store with an HTTP query API", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "cms.yml")]
    config: PathBuf,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the content store and serve the query API
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to the configured address)
        #[arg(short, long)]
        ip: Option<String>,

        /// Rebuild when content files change
        #[arg(short, long)]
        watch: bool,
    },

    /// List content types, or the entities of one type
    List {
        /// Content type to list
        r#type: Option<String>,
    },

    /// Print the sitemap XML
    Sitemap {
        /// Override the configured base address
        #[arg(short, long)]
        base_address: Option<String>,
    },

    /// Build the store and report entities and broken links
    Check {
        /// Fail when internal links do not resolve
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "cms_backend=debug,info"
    } else {
        "cms_backend=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cms = cms_backend::Cms::new(&cli.config)?;

    match cli.command {
        Commands::Serve { port, ip, watch } => {
            tracing::info!("Building content store...");
            let backend = Arc::new(cms.backend()?);

            let ip = ip.unwrap_or_else(|| cms.config.server.ip.clone());
            let port = port.unwrap_or(cms.config.server.port);
            tracing::info!("Starting server at http://{}:{}", ip, port);
            cms_backend::server::start(&cms, backend, &ip, port, watch).await?;
        }

        Commands::List { r#type } => {
            cms_backend::commands::list::run(&cms, r#type.as_deref())?;
        }

        Commands::Sitemap { base_address } => {
            cms_backend::commands::sitemap::run(&cms, base_address.as_deref())?;
        }

        Commands::Check { strict } => {
            tracing::info!("Checking content...");
            cms_backend::commands::check::run(&cms, strict)?;
            println!("Content is valid!");
        }
    }

    Ok(())
}
