//! Error kinds for the depeche core.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while resolving or building dependencies.
///
/// Subprocess variants carry the command tokens, the working directory the
/// child ran in, and a rendered cause (exit status, signal, or spawn
/// failure) so the top-level message identifies the operation, target, and
/// underlying cause in one line.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid manifest for {name} in {path}: {reason}")]
    ManifestParse {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("{name} needs variable {variable}, which is not defined in the environment file")]
    MissingVariable { name: String, variable: String },

    #[error("no version defined for {package}")]
    MissingRevision { package: String },

    #[error("git {args:?} failed in {cwd}: {cause}")]
    Vcs {
        args: Vec<String>,
        cwd: PathBuf,
        cause: String,
    },

    #[error("build command {args:?} failed in {cwd}: {cause}")]
    Build {
        args: Vec<String>,
        cwd: PathBuf,
        cause: String,
    },

    #[error("unsubstituted parameter {token}")]
    UnsubstitutedToken { token: String },

    #[error("filesystem operation failed on {path}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build directory already exists: {path}")]
    CacheCollision { path: PathBuf },
}
