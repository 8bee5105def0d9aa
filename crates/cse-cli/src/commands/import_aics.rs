//! Import-aics command for rendering the sessions of an AICS archive.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cse_core::import::import_file;

use super::util::{write_archive_summary, write_atomic};
use crate::render::RenderFormat;

const DEFAULT_OUTPUT_DIR: &str = "imported-sessions";

#[derive(Debug, Args)]
pub struct ImportAicsArgs {
    /// AICS file to import.
    #[arg(long)]
    pub input: PathBuf,
    /// Directory for the rendered sessions.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub out: PathBuf,
    /// Output format: markdown, md or html.
    #[arg(long, default_value_t)]
    pub format: RenderFormat,
}

/// Outcome of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub written: usize,
    pub total: usize,
}

pub fn run<W: Write>(writer: &mut W, args: &ImportAicsArgs) -> Result<ImportReport> {
    let archive = import_file(&args.input)
        .with_context(|| format!("failed to import {}", args.input.display()))?;
    archive.validate().context("invalid AICS file")?;

    writeln!(writer, "Imported {}", args.input.display())?;
    write_archive_summary(writer, &archive)?;

    let (sessions, messages) = archive.to_records();
    let mut report = ImportReport {
        written: 0,
        total: sessions.len(),
    };

    for session in &sessions {
        let session_messages = messages.get(&session.id).map_or(&[][..], Vec::as_slice);
        let filename = args.format.filename(session);
        let content = args.format.render(session, session_messages);

        if let Err(err) = write_atomic(&args.out.join(&filename), &content) {
            tracing::warn!(session_id = %session.id, error = %format!("{err:#}"), "failed to write session");
            continue;
        }
        report.written += 1;
        writeln!(writer, "  ✓ {filename}")?;
    }

    writeln!(
        writer,
        "Exported {}/{} sessions to {}",
        report.written,
        report.total,
        args.out.display()
    )?;
    Ok(report)
}
