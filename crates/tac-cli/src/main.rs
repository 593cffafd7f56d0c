//! Tac CLI - play a shared Tac board from the terminal.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use tac_config::{init_logging, Config, LogConfig, Paths};
use tracing::debug;

use commands::Context;

/// Tac CLI - create a game, share the link, and play together.
#[derive(Parser)]
#[command(name = "tac")]
#[command(about = "Play Tac on a board shared through Supabase Realtime")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Play without realtime sync or the remote store
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new game and play it
    Create,

    /// Join a game by id or share link
    Join {
        /// Game id or share link
        game: String,
    },

    /// Show the last stored board of a game
    Show {
        /// Game id or share link
        game: String,
    },

    /// Print the share link for a game
    Link {
        /// Game id
        game: String,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    init_logging(&LogConfig {
        default_level: cli.log_level.unwrap_or_else(|| config.log_level.clone()),
        log_file: Some(paths.log_file()),
        also_stderr: false, // keep the board readable
    })?;
    debug!(base_dir = %paths.base_dir().display(), offline = cli.offline, "Starting tac");

    let ctx = Context {
        config,
        paths,
        format: cli.format,
        offline: cli.offline,
    };

    match cli.command {
        Commands::Create => commands::create(&ctx).await,
        Commands::Join { game } => commands::join(&ctx, &game).await,
        Commands::Show { game } => commands::show(&ctx, &game).await,
        Commands::Link { game } => commands::link(&ctx, &game),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{e:#}"), &format);
        std::process::exit(1);
    }
}
