use askdocs::Result;
use askdocs::commands::{ask, index, search, status};
use askdocs::config::{Config, run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "askdocs")]
#[command(about = "Ask questions about a folder of local documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Ollama connection and pipeline settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index new and changed documents in the configured folder
    Index {
        /// Folder to index, overriding the configured one
        #[arg(long)]
        docs_dir: Option<std::path::PathBuf>,
    },
    /// Retrieve the most relevant chunks for a query
    Search {
        /// Query text
        query: String,
        /// Number of results to return
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Answer a question grounded in the indexed documents
    Ask {
        /// The question; omit to start an interactive session
        question: Option<String>,
    },
    /// Show index and connection status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Index { docs_dir } => {
            let mut config = Config::load()?;
            if let Some(docs_dir) = docs_dir {
                config.docs_dir = docs_dir;
            }
            index(&config)?;
        }
        Commands::Search { query, limit } => {
            search(&Config::load()?, &query, limit)?;
        }
        Commands::Ask { question } => {
            ask(&Config::load()?, question)?;
        }
        Commands::Status => {
            status(&Config::load()?)?;
        }
    }

    Ok(())
}
