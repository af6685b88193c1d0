//! # robot
//!
//! **robot** keeps the GitHub Actions workflow files of a user's Go
//! repositories in line with a local template directory.
//!
//! Features:
//! - `robot sync` reconciles `.github/workflows` and opens one pull request per
//!   changed repository (`--merge` merges it right away)
//! - `robot prune` deletes `robot-works-*` branches left behind by earlier runs
//! - `robot templates` lists the templates that would be applied
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use robot::{Overrides, cmd_prune, cmd_sync, cmd_templates};

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "robot",
    version,
    about = "robot - keeps workflow files of Go repositories in sync",
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Reconcile workflow files and open pull requests
    Sync {
        /// Merge each pull request right after opening it
        #[arg(long)]
        merge: bool,
    },
    /// Delete branches left behind by earlier runs
    Prune,
    /// List the loaded templates
    Templates,
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Sync { merge } => cmd_sync(&cli.overrides, merge),
        Cmd::Prune => cmd_prune(&cli.overrides),
        Cmd::Templates => cmd_templates(&cli.overrides),
    }
}
