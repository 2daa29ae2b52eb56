use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod doctor;

use cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        devcell::set_color_mode(mode);
    }

    let settings = devcell::Settings::from_env();
    devcell::telemetry_init(
        settings.log_filter.as_deref(),
        cli.verbose || settings.verbose,
    );

    match &cli.command {
        Command::Init => commands::run_init(&cli, &settings),
        Command::Activate => commands::run_activate(&cli, &settings),
        Command::Status { json } => commands::run_status(&cli, &settings, *json),
        Command::Clean => commands::run_clean(&cli, &settings),
        Command::Doctor => {
            doctor::run_doctor(&settings);
            ExitCode::from(0)
        }
    }
}
