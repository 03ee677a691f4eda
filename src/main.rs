use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use satchel_tui::api::{ApiClient, KnowledgeBase};
use satchel_tui::cli;
use satchel_tui::config::SatchelConfig;
use satchel_tui::error::SatchelError;
use satchel_tui::logging::{init_logging, LoggingConfig};
use satchel_tui::session::SessionStore;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "SATCHEL - terminal clients for your RAG knowledge base")]
#[command(version)]
struct Cli {
    /// Path to a satchel.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL for this invocation
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the auth token locally
    Login {
        #[arg(short, long)]
        username: String,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Clear the stored session (local-only, no server call)
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List documents with status and chunk counts
    List,

    /// Show one document
    Show { id: i64 },

    /// Upload a file as a new document
    Upload {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        file: PathBuf,
    },

    /// Start indexing a document and watch it to completion
    Index {
        id: i64,

        /// Start the job without watching its status
        #[arg(long)]
        no_watch: bool,
    },

    /// Delete a document and its indexed chunks
    Rm {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask a question against the knowledge base
    Ask {
        question: String,

        #[arg(long)]
        top_k: Option<u32>,

        /// Restrict the search to these document ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        docs: Option<Vec<i64>>,

        /// Include the answer trace
        #[arg(long)]
        explain: bool,
    },

    /// Inspect a server-side indexing job
    Jobs { job_id: String },

    /// Launch the interactive dashboard
    #[cfg(feature = "tui")]
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = SatchelConfig::load(args.config.as_deref())?;
    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }
    let state_dir = config.state_dir();

    #[cfg(feature = "tui")]
    let command = args.command.unwrap_or(Command::Tui);
    #[cfg(not(feature = "tui"))]
    let command = match args.command {
        Some(command) => command,
        None => {
            eprintln!("This build has no TUI; run `satchel --help` for commands.");
            return Ok(());
        }
    };

    #[cfg(feature = "tui")]
    let launching_tui = matches!(command, Command::Tui);
    #[cfg(not(feature = "tui"))]
    let launching_tui = false;

    let logging = if launching_tui {
        LoggingConfig::for_tui(&state_dir)
    } else {
        LoggingConfig::for_cli(&state_dir)
    };
    let _log_guard = init_logging(&logging)?;

    let store = SessionStore::open(&state_dir);
    let client = ApiClient::new(&config.api, store.handle())?;
    let backend: Arc<dyn KnowledgeBase> = Arc::new(client);

    if let Err(err) = dispatch(command, config, store, backend).await {
        let message = err
            .downcast_ref::<SatchelError>()
            .map(SatchelError::user_message)
            .unwrap_or_else(|| err.to_string());
        eprintln!("{}", message);
        std::process::exit(1);
    }
    Ok(())
}

async fn dispatch(
    command: Command,
    config: SatchelConfig,
    mut store: SessionStore,
    backend: Arc<dyn KnowledgeBase>,
) -> Result<()> {
    match command {
        #[cfg(feature = "tui")]
        Command::Tui => satchel_tui::tui::run(config, store, backend).await,

        Command::Login { username, password } => {
            cli::login_command(backend.as_ref(), &mut store, &username, password).await
        }
        Command::Logout => cli::logout_command(&mut store),
        Command::Whoami => cli::whoami_command(&store),

        Command::List => {
            store.current().require_token()?;
            cli::list_command(backend.as_ref()).await
        }
        Command::Show { id } => {
            store.current().require_token()?;
            cli::show_command(backend.as_ref(), id).await
        }
        Command::Upload { title, file } => {
            store.current().require_token()?;
            cli::upload_command(backend.as_ref(), &title, file).await
        }
        Command::Index { id, no_watch } => {
            store.current().require_token()?;
            cli::index_command(backend.as_ref(), &config, id, !no_watch).await
        }
        Command::Rm { id, yes } => {
            store.current().require_token()?;
            cli::rm_command(backend.as_ref(), id, yes).await
        }
        Command::Ask {
            question,
            top_k,
            docs,
            explain,
        } => {
            store.current().require_token()?;
            cli::ask_command(backend.as_ref(), question, top_k, docs, explain).await
        }
        Command::Jobs { job_id } => {
            store.current().require_token()?;
            cli::jobs_command(backend.as_ref(), &job_id).await
        }
    }
}
