//! Kiln CLI entry point: argument parsing, logging setup and dispatch.

use clap::Parser;
use kiln_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    ui::init_colors(args.no_color);
    logger::init_logger(args.verbose, args.quiet, ui::colors_enabled());

    let result = match &args.command {
        cli::Command::Build(build) => {
            commands::build_execute(&args, build, kiln_bundler::Phase::All).await
        }
        cli::Command::Components(build) => {
            commands::build_execute(&args, build, kiln_bundler::Phase::Components).await
        }
        cli::Command::Entry(build) => {
            commands::build_execute(&args, build, kiln_bundler::Phase::Entry).await
        }
        cli::Command::Types(build) => {
            commands::build_execute(&args, build, kiln_bundler::Phase::Types).await
        }
        cli::Command::Targets => commands::targets_execute(&args),
    };

    result.map_err(error::cli_error_to_miette)
}
