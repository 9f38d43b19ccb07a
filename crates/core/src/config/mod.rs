//! Configuration loading and schema definitions
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then command-line overrides applied by the binary.

mod loader;
mod schema;

pub use loader::{Config, CONFIG_FILE_NAMES};
pub use schema::*;
