use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "devcell",
    version,
    about = "Build a disposable container from your shell environment and open it on the current project."
)]
pub(crate) struct Cli {
    /// Print detailed execution info (docker commands, build output)
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    /// Only print docker remove/build/run commands; leaves .devcell/ untouched
    #[arg(long = "dry-run", global = true)]
    pub(crate) dry_run: bool,

    /// Colorize diagnostics: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<devcell::ColorMode>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Generate .devcell/Dockerfile from the host environment and devcell.yml
    Init,

    /// Rebuild the project image and open an interactive shell in it
    Activate,

    /// Show the project's image identity and state
    Status {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the project's image and build record (keeps the specification)
    Clean,

    /// Run diagnostics to check environment and configuration
    Doctor,
}
