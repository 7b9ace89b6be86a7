//! Parsing and validation of `lim.toml` linker configuration files.
//!
//! Every section is optional; an absent file or section yields the defaults
//! the linker has always used (promotion threshold 250, aspect ratios
//! 1:1/2:1/1:2, annealing at T0 = 10 with α = 0.99995, and so on).

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
