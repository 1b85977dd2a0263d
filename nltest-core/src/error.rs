//! Typed failures that callers may want to match on.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A required external tool is not on `PATH`.
    #[error("missing dependency `{tool}`\n  install it with: {hint}")]
    MissingDependency { tool: String, hint: String },

    /// The requested Visual Studio year has no known CMake generator.
    #[error("Visual Studio year {year} not supported")]
    UnsupportedToolchainYear { year: String },
}
