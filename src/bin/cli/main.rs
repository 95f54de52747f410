mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "recall-cli", about = "Bilingual vocabulary review with spaced repetition", version)]
struct Cli {
    /// Config file (default: ~/.config/recall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding review state (overrides config and RECALL_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Practice the cards of a vocabulary catalog
    Practice {
        /// JSON array of { id, promptA, promptB } records
        catalog: PathBuf,
        /// Direction for this session (e.g. "a-b", "bg-de"); defaults to the saved one
        #[arg(long)]
        direction: Option<String>,
        /// Maximum cards in the session (0 for no limit)
        #[arg(long)]
        limit: Option<usize>,
        /// Only cards that are new or due
        #[arg(long)]
        due_only: bool,
    },

    /// List review states that are due
    Due {
        #[arg(long)]
        direction: Option<String>,
    },

    /// Show review statistics per direction
    Stats {
        #[arg(long)]
        direction: Option<String>,
    },

    /// Show or change the learning direction
    Direction {
        /// New direction ("a-b", "b-a", "bg-de", "de_to_bg", ...)
        value: Option<String>,
    },

    /// Export all review states as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import review states from an export file
    Import {
        file: PathBuf,
    },

    /// Upgrade legacy single-direction records
    Migrate {
        /// Direction the legacy records were practiced in
        #[arg(long)]
        direction: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.config.as_deref(), cli.data_dir).await?;

    match cli.command {
        Command::Practice { catalog, direction, limit, due_only } => {
            commands::practice::run(
                &app,
                &catalog,
                direction.as_deref(),
                limit,
                due_only,
                &cli.format,
                use_color,
            )
            .await?;
        }
        Command::Due { direction } => {
            commands::due::run(&app, direction.as_deref(), &cli.format, use_color).await?;
        }
        Command::Stats { direction } => {
            commands::stats::run(&app, direction.as_deref(), &cli.format, use_color).await?;
        }
        Command::Direction { value } => {
            commands::direction::run(&app, value.as_deref(), &cli.format, use_color).await?;
        }
        Command::Export { output } => {
            commands::transfer::run_export(&app, output.as_deref(), &cli.format).await?;
        }
        Command::Import { file } => {
            commands::transfer::run_import(&app, &file, &cli.format).await?;
        }
        Command::Migrate { direction } => {
            commands::migrate::run(&app, direction.as_deref(), &cli.format).await?;
        }
    }

    Ok(())
}
