//! # docqa CLI
//!
//! Question answering over local documents with per-session memory.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa ingest <path>` | Extract, chunk, embed, and index a PDF or text file |
//! | `docqa documents list` | List ingested documents, newest first |
//! | `docqa documents show <id>` | Show one document's metadata |
//! | `docqa documents chunks <id>` | Print a document's chunks |
//! | `docqa documents delete <id>` | Remove a document and its vectors |
//! | `docqa ask "<question>" --session <id>` | Answer from retrieved context |
//! | `docqa history <session>` | Print a session's messages |
//! | `docqa sessions` | List sessions by last activity |
//! | `docqa clear <session>` | Delete a session's messages |
//!
//! ## Examples
//!
//! ```bash
//! docqa init
//! docqa ingest ./papers/attention.pdf --strategy recursive
//! docqa ask "What does multi-head attention add?" --session s1
//! docqa ask "And why scale the dot product?" --session s1 --json
//! docqa clear s1
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use docqa::app::AppContext;
use docqa::config;
use docqa::{ask, documents, ingest, logging, migrate, sessions};
use docqa_core::RagError;

/// docqa: retrieval-augmented question answering over your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Retrieval-augmented question answering over local documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Ingest a PDF or plain-text file.
    Ingest {
        /// File to ingest (`.pdf`, `.txt`, `.md`).
        path: PathBuf,

        /// Name to store instead of the file name.
        #[arg(long)]
        name: Option<String>,

        /// Chunking strategy: `fixed` or `recursive`.
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Inspect and manage ingested documents.
    Documents {
        #[command(subcommand)]
        action: DocumentsAction,
    },

    /// Ask a question.
    ///
    /// The question and answer are recorded in the session, and up to five
    /// prior turns are included in the prompt.
    Ask {
        question: String,

        /// Conversation session id (any string).
        #[arg(long)]
        session: String,

        /// Restrict retrieval to a document id. Repeatable.
        #[arg(long = "doc")]
        docs: Vec<String>,

        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a session's most recent messages, oldest first.
    History {
        session: String,

        #[arg(long, default_value_t = sessions::DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// List sessions, most recently active first.
    Sessions {
        /// Show only this session; fails if it has no messages.
        #[arg(long)]
        session: Option<String>,
    },

    /// Delete every message in a session.
    Clear { session: String },
}

#[derive(Subcommand)]
enum DocumentsAction {
    /// List documents, newest first.
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a document's metadata.
    Show { id: String },
    /// Print a document's chunks in order.
    Chunks { id: String },
    /// Delete a document, its chunks, and its vectors.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<RagError>() {
                Some(rag) => eprintln!("error[{}]: {}", rag.tag(), rag.public_message()),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized at {}", cfg.db.path.display());
        return Ok(());
    }

    let app = AppContext::init(cfg).await?;
    let result = dispatch(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn dispatch(app: &AppContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => Ok(()),
        Commands::Ingest {
            path,
            name,
            strategy,
        } => ingest::run_ingest(app, &path, name.as_deref(), strategy.as_deref()).await,
        Commands::Documents { action } => match action {
            DocumentsAction::List { offset, limit } => {
                documents::run_list(app, offset, limit).await
            }
            DocumentsAction::Show { id } => documents::run_show(app, &id).await,
            DocumentsAction::Chunks { id } => documents::run_chunks(app, &id).await,
            DocumentsAction::Delete { id } => documents::run_delete(app, &id).await,
        },
        Commands::Ask {
            question,
            session,
            docs,
            top_k,
            json,
        } => ask::run_ask(app, &question, &session, docs, top_k, json).await,
        Commands::History { session, limit } => {
            sessions::run_history(app, &session, limit).await
        }
        Commands::Sessions { session } => sessions::run_sessions(app, session.as_deref()).await,
        Commands::Clear { session } => sessions::run_clear(app, &session).await,
    }
}
