//! Export command for rendering one session as Markdown or HTML.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cse_db::ProviderKind;

use super::util::{fetch_session, open_providers, write_atomic};
use crate::Config;
use crate::render::RenderFormat;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Session ID to export.
    #[arg(long)]
    pub session: String,
    /// Session store to read: crush or claude-code (default: search every store found).
    #[arg(long)]
    pub provider: Option<ProviderKind>,
    /// Output format: markdown, md or html.
    #[arg(long, default_value_t)]
    pub format: RenderFormat,
    /// Output file (defaults to a generated name in the output directory).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run<W: Write>(writer: &mut W, args: &ExportArgs, config: &Config) -> Result<PathBuf> {
    let (owner, session) = fetch_session(open_providers(args.provider, config)?, &args.session)?;
    let messages = owner
        .provider
        .list_messages(&session.id)
        .with_context(|| format!("failed to fetch messages for session {}", session.id))?;
    tracing::debug!(
        provider = %owner.kind,
        session_id = %session.id,
        messages = messages.len(),
        "loaded session"
    );

    let content = args.format.render(&session, &messages);
    let path = args
        .out
        .clone()
        .unwrap_or_else(|| config.output_dir.join(args.format.filename(&session)));
    write_atomic(&path, &content)?;

    writeln!(
        writer,
        "Exported session {} ({} messages) to {}",
        session.id,
        messages.len(),
        path.display()
    )?;
    Ok(path)
}
