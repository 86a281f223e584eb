//! The `settings` module loads `settings/*.toml` with environment overrides.
//! See `bin/settings_demo.rs` for a binary demonstrating its usage.

mod cli;
pub use clap::{Parser, Subcommand};
pub use cli::*;

mod settings;
pub use settings::*;
