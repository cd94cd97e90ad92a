//! CLI entry point for mdxpress

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mdxpress")]
#[command(version)]
#[command(about = "A static site builder for MDX-authored blogs", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post
    New {
        /// Title of the new post
        title: String,

        /// Slug (defaults to the slugified title)
        #[arg(short, long)]
        slug: Option<String>,

        /// Comma-separated tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Build the static site
    #[command(alias = "generate", alias = "g")]
    Build {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Clean the public folder
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, tag)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "mdxpress=debug,info"
    } else {
        "mdxpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            mdxpress::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::New { title, slug, tags } => {
            let site = mdxpress::Site::new(&base_dir)?;
            tracing::info!("Creating new post with title: {}", title);
            let tags: Vec<String> = tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            let path = site.new_post(&title, slug.as_deref(), &tags)?;
            println!("Created: {:?}", path);
        }

        Commands::Build { watch } => {
            let site = mdxpress::Site::new(&base_dir)?;
            tracing::info!("Building site...");

            if let Err(e) = site.build().await {
                if !watch {
                    return Err(e);
                }
                tracing::error!("Initial build failed: {:#}", e);
            } else {
                println!("Built successfully!");
            }

            if watch {
                mdxpress::commands::build::watch(&site).await?;
            }
        }

        Commands::Clean => {
            let site = mdxpress::Site::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let site = mdxpress::Site::new(&base_dir)?;
            mdxpress::commands::list::run(&site, &r#type)?;
        }

        Commands::Version => {
            println!("mdxpress version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
