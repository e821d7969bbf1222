//! Docent daemon - document question-answering over SSE

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use docent::config::Config;
use docent::embedding::EmbeddingModel;
use docent::error::Result;
use docent::files::FileStore;
use docent::generation::ChatClient;
use docent::index::LanceIndex;
use docent::server::{AppState, DocentServer};

/// Docent - a document question-answering backend
#[derive(Parser)]
#[command(name = "docent")]
#[command(about = "A document question-answering backend with token-filtered SSE streaming")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the server (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config).await,
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,docent=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = config_path {
        tracing::info!("Loading config from: {}", path.display());
        return read_config(&path);
    }

    let default_paths = [
        dirs::home_dir().map(|h| h.join(".docent").join("config.toml")),
        dirs::config_dir().map(|c| c.join("docent").join("config.toml")),
        Some(PathBuf::from("config.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            tracing::info!("Loading config from: {}", path.display());
            return read_config(path);
        }
    }

    tracing::info!("No config file found, using defaults");
    Ok(Config::default())
}

fn read_config(path: &std::path::Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        docent::DocentError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    toml::from_str(&content)
        .map_err(|e| docent::DocentError::Config(format!("Failed to parse config: {e}")))
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    tracing::info!("Starting Docent daemon");

    let config = load_config(config_path)?;
    tracing::debug!("Config loaded: {:?}", config);

    let data_dir = &config.storage.data_dir;
    tracing::info!("Initializing index at: {}", data_dir.display());

    std::fs::create_dir_all(data_dir).map_err(|e| {
        docent::DocentError::Index(format!(
            "Failed to create data directory {}: {}",
            data_dir.display(),
            e
        ))
    })?;

    let mut index = LanceIndex::connect(data_dir).await?;

    if index.table_exists("chunks").await? {
        tracing::debug!("Opening existing chunks table");
        index.open_chunks_table().await?;
    } else {
        tracing::info!("Creating chunks table");
        index.create_chunks_table().await?;
    }

    tracing::info!("Initializing embedding model (this may take a moment on first run)...");
    let embedder = EmbeddingModel::new()?;
    tracing::info!("Embedding model initialized");

    let chat = ChatClient::from_env(config.generation.clone())?;

    let state = Arc::new(AppState {
        files: FileStore::new(config.storage.uploads_dir.clone()),
        chat: Arc::new(chat),
        embedder: Arc::new(embedder),
        index: Arc::new(TokioMutex::new(index)),
        config,
    });

    tracing::info!(
        "Starting server on {}",
        state.config.server.listen_addr
    );

    DocentServer::new(state).serve().await?;

    tracing::info!("Docent daemon stopped");
    Ok(())
}
