//! Core engine for depeche, a source-dependency fetcher and builder for
//! CMake projects.
//!
//! Given a `depeche.json` manifest pinning a transitive graph of source
//! repositories, this crate materializes every dependency at its pinned
//! revision into a content-addressed cache, runs each dependency's build
//! recipe into a cache-keyed install root, and supplies the data for a
//! generated CMake include file. It is consumed by the `depeche` CLI
//! front end without coupling to any UI.
//!
//! # Cache layout
//!
//! ```text
//! $DEPECHE_HOME/                       (default ~/.depeche)
//! ├── repositories/<sha1(source)>/     # bare clone of the upstream repo
//! ├── work/<sha1(source)>/             # working checkout, remote `work` on the bare clone
//! ├── roots/<sha1(key)>/<rev>/         # cached manifest for source × revision
//! ├── roots/<sha1(key)>/<rev>/<vars>/  # install root for source × revision × variables
//! └── tmp/<sha1(install root)>/        # transient build directory
//! ```

/// Build orchestration over the definition tree.
pub mod builder;
/// Generated CMake include file.
pub mod cmake;
/// Error kinds shared across the crate.
pub mod error;
/// Restricted expression language for conditional build steps.
pub mod expr;
/// Adapter around the external `git` binary.
pub mod git;
/// Transitive dependency expansion into a definition tree.
pub mod graph;
/// Content-addressed identity for cache entries.
pub mod ident;
/// Manifest and sidecar environment parsing.
pub mod manifest;
/// On-disk cache layout under `DEPECHE_HOME`.
pub mod store;
/// Per-definition substitution variables.
pub mod vars;

pub use builder::Builder;
pub use error::{Error, Result};
pub use git::GitClient;
pub use graph::{DefinitionTree, expand};
pub use store::CacheStore;
