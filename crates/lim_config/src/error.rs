//! Failures while loading `lim.toml`.

use std::path::PathBuf;

/// Why a configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was opened.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// Not valid TOML, or a key the linker does not know.
    #[error("malformed configuration: {0}")]
    Syntax(#[from] toml::de::Error),

    /// Well-formed, but a value is out of range.
    #[error("bad value for `{key}`: {reason}")]
    Invalid {
        /// Dotted key, e.g. `tour.alpha`.
        key: &'static str,
        /// Accepted range.
        reason: &'static str,
    },
}
