//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::export::ExportArgs;
use crate::commands::export_aics::ExportAicsArgs;
use crate::commands::import_aics::ImportAicsArgs;
use crate::commands::list::ListArgs;
use crate::commands::validate::ValidateArgs;

/// Crush session explorer.
///
/// Browses local AI coding-tool session databases, renders sessions as
/// Markdown or HTML, and converts them to and from the AICS interchange
/// format.
#[derive(Debug, Parser)]
#[command(name = "cse", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List recent sessions.
    List(ListArgs),

    /// Render one session as Markdown or HTML.
    Export(ExportArgs),

    /// Export sessions to an AICS archive.
    ExportAics(ExportAicsArgs),

    /// Render every session of an AICS archive.
    ImportAics(ImportAicsArgs),

    /// Check an AICS file.
    Validate(ValidateArgs),

    /// Show the client id stamped on exported sessions.
    ClientId,
}
