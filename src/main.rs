use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tether::{Result, cmd, config};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the tether client
#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Sync a local source folder to a remote code-ingestion service")]
#[command(version)]
struct Cli {
   #[arg(long, env = "TETHER_BACKEND_URL", help = "Backend base URL override")]
   backend: Option<String>,

   #[arg(long, env = "TETHER_AUTH_TOKEN", help = "Bearer token override", hide_env_values = true)]
   token: Option<String>,

   #[command(subcommand)]
   command: Cmd,
}

/// Available subcommands for tether
#[derive(Subcommand)]
enum Cmd {
   #[command(about = "Ingest or incrementally sync a folder")]
   Sync {
      #[arg(help = "Folder to sync (default: cwd)")]
      path: Option<PathBuf>,

      #[arg(long, help = "JSON event output")]
      json: bool,
   },

   #[command(about = "Show the server's view of a folder's ingestion")]
   Status {
      #[arg(help = "Folder to inspect (default: cwd)")]
      path: Option<PathBuf>,

      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Retry a failed ingestion and re-sync")]
   Retry {
      #[arg(help = "Folder to retry (default: cwd)")]
      path: Option<PathBuf>,
   },

   #[command(about = "Send a chat message against the ingested folder")]
   Chat {
      #[arg(help = "Message to send")]
      message: String,

      #[arg(help = "Folder providing context (default: cwd)")]
      path: Option<PathBuf>,

      #[arg(long, help = "Stream the reply as it is generated")]
      stream: bool,

      #[arg(short = 'm', long, help = "Model id (default: service default)")]
      model: Option<String>,

      #[arg(short = 's', long, help = "Continue an existing session")]
      session: Option<String>,
   },

   #[command(about = "List chat sessions for a folder")]
   Sessions {
      #[arg(help = "Folder (default: cwd)")]
      path: Option<PathBuf>,
   },

   #[command(about = "Show the message history of a session")]
   History {
      #[arg(help = "Session id")]
      session_id: String,
   },

   #[command(name = "delete-session", about = "Delete a chat session")]
   DeleteSession {
      #[arg(help = "Session id")]
      session_id: String,
   },

   #[command(about = "List available chat models")]
   Models,

   #[command(about = "Show the local Merkle root, optionally against the server's copy")]
   Tree {
      #[arg(help = "Folder (default: cwd)")]
      path: Option<PathBuf>,

      #[arg(long, help = "Fetch and compare the server's stored tree")]
      pull: bool,

      #[arg(long, help = "Replace the server's stored tree with the local one")]
      push: bool,
   },
}

#[tokio::main]
async fn main() -> Result<()> {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
      .init();

   let cli = Cli::parse();

   let mut cfg = config::load()?;
   if let Some(backend) = cli.backend {
      cfg.backend_url = backend;
   }
   if let Some(token) = cli.token {
      cfg.auth_token = token;
   }
   config::init(cfg);

   match cli.command {
      Cmd::Sync { path, json } => cmd::sync::execute(path, json).await,
      Cmd::Status { path, json } => cmd::status::execute(path, json).await,
      Cmd::Retry { path } => cmd::retry::execute(path).await,
      Cmd::Chat { message, path, stream, model, session } => {
         cmd::chat::execute(message, path, stream, model, session).await
      },
      Cmd::Sessions { path } => cmd::sessions::execute(path).await,
      Cmd::History { session_id } => cmd::history::execute(session_id).await,
      Cmd::DeleteSession { session_id } => cmd::delete_session::execute(session_id).await,
      Cmd::Models => cmd::models::execute().await,
      Cmd::Tree { path, pull, push } => cmd::tree::execute(path, pull, push).await,
   }
}
