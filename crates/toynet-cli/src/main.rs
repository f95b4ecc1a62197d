use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "toynet")]
#[command(about = "ToyNet - disposable emulated network sessions", long_about = None)]
struct Cli {
    /// Path of config.toml (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path of the store file (overrides the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage topology templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Inspect persisted sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Open an interactive shell on a new or existing session
    Shell {
        /// Template to create a new session from
        #[arg(long, requires = "user", conflicts_with = "session")]
        topo: Option<u64>,
        /// Owner of the new session
        #[arg(long, requires = "topo")]
        user: Option<String>,
        /// Existing session to attach to
        #[arg(long, required_unless_present = "topo")]
        session: Option<u64>,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Store the topology in FILE under ID
    Add { id: u64, file: PathBuf },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user
    Add { name: String },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List persisted sessions
    List,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let env = commands::Environment::load(cli.config, cli.store)?;

    match cli.command {
        Commands::Template { action } => match action {
            TemplateAction::Add { id, file } => commands::admin::add_template(&env, id, &file).await?,
        },
        Commands::User { action } => match action {
            UserAction::Add { name } => commands::admin::add_user(&env, &name).await?,
        },
        Commands::Session { action } => match action {
            SessionAction::List => commands::admin::list_sessions(&env).await?,
        },
        Commands::Shell {
            topo,
            user,
            session,
        } => {
            let target = match (session, topo, user) {
                (Some(id), _, _) => commands::shell::Target::Existing(id),
                (None, Some(topo_id), Some(user_id)) => commands::shell::Target::New { topo_id, user_id },
                _ => anyhow::bail!("either --session or both --topo and --user are required"),
            };
            commands::shell::run(&env, target).await?;
        }
    }

    Ok(())
}
