//! Command-line interface definition.
//!
//! - `kiln build` - components, aggregate entry and declarations
//! - `kiln components` - one bundle per component unit
//! - `kiln entry` - the aggregate entry bundle
//! - `kiln types` - declarations, then distribution into every target
//! - `kiln targets` - print the resolved format matrix

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Kiln - build a component library into several module formats
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Build a component library into several module formats")]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project root searched for `kiln.toml` or a `package.json` "kiln" field
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Explicit configuration file (skips discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build components, the aggregate entry and declarations
    Build(BuildArgs),

    /// Bundle every component unit that has an entry file
    Components(BuildArgs),

    /// Bundle the aggregate entry
    Entry(BuildArgs),

    /// Emit declarations and copy them into every target
    Types(BuildArgs),

    /// Print the configured output targets
    Targets,
}

/// Options shared by every build phase.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Override `paths.output` (relative to the project root)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Do not print per-file sizes
    #[arg(long)]
    pub no_size: bool,
}
