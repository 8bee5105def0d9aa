//! Crush session explorer CLI library.
//!
//! This crate provides the `cse` command-line interface: session listing,
//! Markdown/HTML rendering, and AICS export and import.

mod cli;
pub mod client_id;
pub mod commands;
mod config;
pub mod render;

pub use cli::{Cli, Commands};
pub use config::Config;
