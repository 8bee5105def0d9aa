//! Client-id command for showing this installation's identity.

use std::io::Write;

use anyhow::Result;

use crate::{Config, client_id};

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let client = client_id::resolve(config);
    writeln!(writer, "{} ({})", client.id, client.source)?;
    Ok(())
}
