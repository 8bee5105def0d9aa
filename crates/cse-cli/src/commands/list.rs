//! List command for browsing sessions in a tool's database.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use cse_core::record::SessionRecord;
use cse_core::timestamp::parse_timestamp;
use cse_db::ProviderKind;
use serde::Serialize;

use super::util::{OwnedSession, list_sessions, open_providers};
use crate::Config;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Session store to read: crush or claude-code (default: every store found).
    #[arg(long)]
    pub provider: Option<ProviderKind>,
    /// Maximum number of sessions (defaults to the configured limit).
    #[arg(long)]
    pub limit: Option<usize>,
    /// Print one JSON object per line.
    #[arg(long)]
    pub json: bool,
}

/// One JSON line: the session record plus the provider that owns it.
#[derive(Serialize)]
struct JsonSession<'a> {
    provider: &'static str,
    #[serde(flatten)]
    session: &'a SessionRecord,
}

pub fn run<W: Write>(writer: &mut W, args: &ListArgs, config: &Config) -> Result<()> {
    let providers = open_providers(args.provider, config)?;
    let sessions = list_sessions(&providers, args.limit.unwrap_or(config.limit))?;

    if args.json {
        for owned in &sessions {
            let line = JsonSession {
                provider: owned.kind.as_str(),
                session: &owned.session,
            };
            serde_json::to_writer(&mut *writer, &line).context("failed to serialize session")?;
            writeln!(writer)?;
        }
    } else {
        write!(writer, "{}", format_sessions(&sessions))?;
    }
    Ok(())
}

/// Formats sessions as an aligned table.
pub fn format_sessions(sessions: &[OwnedSession]) -> String {
    let mut output = String::new();

    if sessions.is_empty() {
        writeln!(output, "No sessions found.").unwrap();
        return output;
    }

    let id_width = sessions
        .iter()
        .map(|s| s.session.id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2);

    writeln!(
        output,
        "{:<id_width$}  {:<16}  {:>5}  {:<11}  Title",
        "ID", "Created", "Msgs", "Provider"
    )
    .unwrap();
    for owned in sessions {
        let session = &owned.session;
        let created = session
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string());
        let count = session
            .message_count
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        writeln!(
            output,
            "{:<id_width$}  {created:<16}  {count:>5}  {:<11}  {}",
            session.id,
            owned.kind.as_str(),
            session.display_title()
        )
        .unwrap();
    }

    output
}
