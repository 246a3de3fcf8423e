//! Manifest (`depeche.json`) and sidecar environment parsing.
//!
//! A manifest declares a dependency's canonical source, the revisions it
//! pins (only honored at the root), its direct dependencies, its build
//! recipe, and the environment-file variables the recipe consumes.
//! Unknown fields are ignored so manifests can carry tooling metadata.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// A parsed `depeche.json` document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    /// Canonical source key; inherited from the parent reference when absent.
    pub source: Option<String>,
    /// Revision pins, keyed by source. Only the root's map takes effect.
    pub dependency_versions: HashMap<String, String>,
    /// Direct dependencies.
    pub dependencies: Vec<DependencyRef>,
    /// The build recipe.
    pub build_steps: Vec<BuildStep>,
    /// Environment-file keys this dependency consumes.
    pub needed_variables: Vec<String>,
}

impl Manifest {
    /// Load and parse the manifest at `path` describing the definition
    /// `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestParse`] naming the definition and file
    /// when the file cannot be read or does not conform to the schema.
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        debug!("Loading dependency file {}", path.display());
        let contents = fs::read_to_string(path).map_err(|err| Error::ManifestParse {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|err| Error::ManifestParse {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

/// One entry of `dependencies[]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRef {
    /// Human identifier; uppercased for the `<NAME>_ROOT` variable.
    pub name: String,
    #[serde(default)]
    pub source_type: SourceType,
    /// Repository URL for git dependencies, a local manifest path for
    /// file dependencies.
    #[serde(default)]
    pub source: String,
}

/// How a dependency's manifest is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Git,
    File,
}

/// One element of `buildSteps[]`: a single command, or a group of
/// commands gated by an optional condition expression. Any other shape
/// fails the manifest parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BuildStep {
    Command(CommandStep),
    Group(StepGroup),
}

/// A command with an optional working directory below the build root.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandStep {
    /// Command tokens; `%%NAME%%` placeholders are substituted from the
    /// variable map before execution.
    pub command: Vec<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// A conditional group of commands.
#[derive(Debug, Clone, Deserialize)]
pub struct StepGroup {
    pub commands: Vec<CommandStep>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Load the sidecar environment file: a flat JSON object mapping
/// variable names to string values.
pub fn load_environment(path: &Path) -> Result<HashMap<String, String>> {
    debug!("Loading environment file {}", path.display());
    let contents = fs::read_to_string(path).map_err(|err| Error::ManifestParse {
        name: "environment".to_string(),
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|err| Error::ManifestParse {
        name: "environment".to_string(),
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}
