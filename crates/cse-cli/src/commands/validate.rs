//! Validate command for checking an AICS file without converting it.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cse_core::import::import_file;

use super::util::write_archive_summary;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// AICS file to check.
    pub file: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, args: &ValidateArgs) -> Result<()> {
    let archive = import_file(&args.file)
        .with_context(|| format!("failed to import {}", args.file.display()))?;
    archive
        .validate()
        .with_context(|| format!("invalid AICS file {}", args.file.display()))?;

    writeln!(writer, "Valid AICS archive: {}", args.file.display())?;
    write_archive_summary(writer, &archive)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn write_file(dir: &std::path::Path, json: &str) -> PathBuf {
        let path = dir.join("check.aics.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn valid_archive_prints_summary() {
        let temp = tempfile::tempdir().unwrap();
        let file = write_file(
            temp.path(),
            r#"{
                "version": "1.0",
                "creator": {"name": "crush-session-explorer", "version": "0.1.0"},
                "log": {
                    "version": "1.0",
                    "creator": {"name": "crush-session-explorer"},
                    "sessions": [{
                        "id": "s1",
                        "messages": [{"id": "m1", "role": "user", "content": [{"type": "text", "text": "hi"}]}]
                    }]
                }
            }"#,
        );

        let mut output = Vec::new();
        run(&mut output, &ValidateArgs { file }).unwrap();

        let output = String::from_utf8(output).unwrap();
        let summary: String = output.lines().skip(1).map(|l| format!("{l}\n")).collect();
        assert!(output.starts_with("Valid AICS archive: "));
        assert_snapshot!(summary, @r"
        Format version: 1.0
        Created by: crush-session-explorer v0.1.0
        Sessions: 1
        Messages: 1
        ");
    }

    #[test]
    fn message_without_content_is_invalid() {
        let temp = tempfile::tempdir().unwrap();
        let file = write_file(
            temp.path(),
            r#"{
                "version": "1.0",
                "creator": {"name": "x"},
                "log": {
                    "version": "1.0",
                    "creator": {"name": "x"},
                    "sessions": [{"id": "s1", "messages": [{"id": "m1", "role": "user", "content": []}]}]
                }
            }"#,
        );

        let err = run(&mut Vec::new(), &ValidateArgs { file }).unwrap_err();
        assert!(
            err.root_cause()
                .to_string()
                .ends_with("session s1, message m1: no content")
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let file = write_file(temp.path(), "{not json");

        let err = run(&mut Vec::new(), &ValidateArgs { file }).unwrap_err();
        assert!(format!("{err:#}").contains("malformed archive"));
    }
}
