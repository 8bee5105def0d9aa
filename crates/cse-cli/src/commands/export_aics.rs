//! Export-aics command for writing sessions in the AICS interchange format.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use cse_core::export::{export_archive, export_sessions_individually};
use cse_core::record::SessionRecord;
use cse_core::{FORMAT_NAME, FORMAT_VERSION};
use cse_db::ProviderKind;

use super::util::{OwnedSession, list_sessions, messages_for, open_providers, write_atomic};
use crate::{Config, client_id};

const DEFAULT_ARCHIVE_PATH: &str = "sessions.aics.json";
const DEFAULT_INDIVIDUAL_DIR: &str = "sessions";
const EXAMPLE_FILES: usize = 3;

#[derive(Debug, Args)]
pub struct ExportAicsArgs {
    /// Session store to read: crush or claude-code (default: every store found).
    #[arg(long)]
    pub provider: Option<ProviderKind>,
    /// Name of the originating tool recorded in the archive.
    #[arg(long)]
    pub tool_name: Option<String>,
    /// Maximum number of sessions (defaults to the configured limit).
    #[arg(long)]
    pub limit: Option<usize>,
    /// Output file, or directory with --individual.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Write each session to its own file under YYYY/MM/DD/.
    #[arg(long)]
    pub individual: bool,
    /// Write JSON without indentation.
    #[arg(long)]
    pub compact: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ExportAicsArgs, config: &Config) -> Result<Vec<PathBuf>> {
    let providers = open_providers(args.provider, config)?;
    let owned = list_sessions(&providers, args.limit.unwrap_or(config.limit))?;
    if owned.is_empty() {
        match args.provider {
            Some(kind) => bail!("no sessions found in {kind} database"),
            None => bail!("no sessions found in any session database"),
        }
    }
    writeln!(writer, "Found {} sessions to export", owned.len())?;

    let messages = messages_for(&providers, &owned)?;

    if args.individual {
        let client = client_id::resolve(config);
        tracing::debug!(client_id = %client.id, source = %client.source, "resolved client id");

        let base = args
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INDIVIDUAL_DIR));
        let mut written = Vec::with_capacity(owned.len());
        for (kind, sessions) in group_by_provider(&owned) {
            let tool_name = args.tool_name.as_deref().unwrap_or_else(|| kind.tool_name());
            let paths =
                export_sessions_individually(&sessions, &messages, &base, tool_name, Some(&client.id))
                    .context("failed to export sessions")?;
            written.extend(paths);
        }

        writeln!(writer, "Client ID: {}", client.id)?;
        writeln!(
            writer,
            "Exported {} sessions to individual files in {} ({FORMAT_NAME} v{FORMAT_VERSION})",
            written.len(),
            base.display()
        )?;
        write_examples(writer, &written, &base)?;
        Ok(written)
    } else {
        let tool_name = args
            .tool_name
            .clone()
            .unwrap_or_else(|| combined_tool_name(&owned));
        let sessions: Vec<SessionRecord> = owned.into_iter().map(|o| o.session).collect();
        let archive =
            export_archive(&sessions, &messages, &tool_name).context("failed to export to AICS")?;
        let json = if args.compact {
            archive.to_json_compact()
        } else {
            archive.to_json_pretty()
        }
        .context("failed to serialize archive")?;

        let path = args
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_PATH));
        write_atomic(&path, &json)?;

        writeln!(
            writer,
            "Exported {} sessions to {} ({FORMAT_NAME} v{FORMAT_VERSION})",
            archive.sessions().len(),
            path.display()
        )?;
        Ok(vec![path])
    }
}

/// Splits sessions by owning provider, keeping first-seen provider order.
fn group_by_provider(owned: &[OwnedSession]) -> Vec<(ProviderKind, Vec<SessionRecord>)> {
    let mut groups: Vec<(ProviderKind, Vec<SessionRecord>)> = Vec::new();
    for session in owned {
        match groups.iter_mut().find(|(kind, _)| *kind == session.kind) {
            Some((_, list)) => list.push(session.session.clone()),
            None => groups.push((session.kind, vec![session.session.clone()])),
        }
    }
    groups
}

/// Tool names of every provider that contributed sessions, e.g. `Crush, Claude Code`.
fn combined_tool_name(owned: &[OwnedSession]) -> String {
    group_by_provider(owned)
        .iter()
        .map(|(kind, _)| kind.tool_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_examples<W: Write>(writer: &mut W, written: &[PathBuf], base: &Path) -> Result<()> {
    if written.is_empty() {
        return Ok(());
    }
    writeln!(writer, "Example files:")?;
    for path in written.iter().take(EXAMPLE_FILES) {
        let relative = path.strip_prefix(base).unwrap_or(path);
        writeln!(writer, "  - {}", relative.display())?;
    }
    if written.len() > EXAMPLE_FILES {
        writeln!(writer, "  ... and {} more", written.len() - EXAMPLE_FILES)?;
    }
    Ok(())
}
