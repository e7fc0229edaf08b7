//! `kiln targets`: a read-only view of the format matrix.

use crate::cli::Cli;
use crate::commands::load_config;
use crate::error::Result;
use crate::ui;

pub fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli, None)?;
    ui::print_targets(&config.target_matrix());
    Ok(())
}
