//! Error type shared by the project, metadata and bump modules.
//!
//! Every variant carries a human-readable message. The variant itself is the failure
//! category, so callers holding an [`anyhow::Error`] can recover it with
//! `err.downcast_ref::<BumpError>()`.

use thiserror::Error;

use crate::pbxproj::ParseError;

pub type Result<T, E = BumpError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BumpError {
    /// Zero or several project containers in the working directory.
    #[error("{0}")]
    Discovery(String),

    /// A target, configuration, setting or metadata key is missing.
    #[error("{0}")]
    Structure(String),

    /// A value exists but is not the expected scalar type.
    #[error("{0}")]
    TypeMismatch(String),

    /// An operation was requested in an environment that cannot support it.
    #[error("{0}")]
    Precondition(String),

    #[error("Failed to parse project file")]
    Parse(#[from] ParseError),

    #[error("Invalid pattern")]
    Pattern(#[from] regex::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Plist error")]
    Plist(#[from] plist::Error),
}
