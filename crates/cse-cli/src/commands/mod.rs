//! CLI subcommand implementations.

pub mod client_id;
pub mod export;
pub mod export_aics;
pub mod import_aics;
pub mod list;
pub mod util;
pub mod validate;
