//! Transitive dependency expansion.
//!
//! The expander turns the root manifest into an immutable tree of
//! [`Definition`] nodes, fetching each git dependency's manifest at its
//! pinned revision along the way. Nodes live in an arena and refer to
//! their children by [`DefId`]; cycles cannot occur because every
//! child's identity is either a fresh content hash or a revision-pinned
//! repository.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::git::GitClient;
use crate::ident::Ident;
use crate::manifest::{BuildStep, CommandStep, Manifest, SourceType};
use crate::store::CacheStore;

/// Index of a node in a [`DefinitionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(usize);

/// One resolved node of the dependency tree.
#[derive(Debug)]
pub struct Definition {
    /// Human identifier from the parent's dependency entry.
    pub name: String,
    /// Canonical origin: a repository URL, or the content hash of a file
    /// dependency that declares no `source` of its own.
    pub source: Option<String>,
    /// Cache identity. `None` for the root project, which is never built.
    pub source_key: Option<String>,
    /// Revision pinned for `source`, when one exists.
    pub revision: Option<String>,
    /// Recipe with conditions already parsed.
    pub build_steps: Vec<Step>,
    /// Environment-file keys the recipe consumes.
    pub needed_variables: Vec<String>,
    /// Direct dependencies, in manifest order.
    pub children: Vec<DefId>,
}

/// A build step with its condition parsed.
#[derive(Debug)]
pub enum Step {
    Command(CommandStep),
    Group {
        commands: Vec<CommandStep>,
        condition: Option<Expr>,
    },
}

/// Immutable arena of definitions produced by [`expand`].
#[derive(Debug)]
pub struct DefinitionTree {
    nodes: Vec<Definition>,
    root: DefId,
}

impl DefinitionTree {
    /// The root project.
    pub fn root(&self) -> DefId {
        self.root
    }

    /// Look up a node.
    pub fn node(&self, id: DefId) -> &Definition {
        &self.nodes[id.0]
    }
}

/// Expand the manifest at `root_manifest` into the full definition tree.
pub fn expand(
    store: &CacheStore,
    git: &mut GitClient<'_>,
    root_manifest: &Path,
) -> Result<DefinitionTree> {
    let mut expander = Expander {
        store,
        git,
        nodes: Vec::new(),
    };
    let root = expander.build_node("root project", root_manifest, None, None)?;
    Ok(DefinitionTree {
        nodes: expander.nodes,
        root,
    })
}

struct Expander<'a, 'g> {
    store: &'a CacheStore,
    git: &'a mut GitClient<'g>,
    nodes: Vec<Definition>,
}

impl Expander<'_, '_> {
    fn build_node(
        &mut self,
        name: &str,
        manifest_path: &Path,
        source_key: Option<String>,
        inherited: Option<&HashMap<String, String>>,
    ) -> Result<DefId> {
        let manifest = Manifest::load(name, manifest_path)?;

        // All pins come from the top: a non-empty inherited map shadows
        // whatever this manifest declares.
        let pins = match inherited {
            Some(parent) if !parent.is_empty() => {
                if !manifest.dependency_versions.is_empty() {
                    warn!("{name}: dependencyVersions ignored; pins are inherited from the root");
                }
                parent
            }
            _ => &manifest.dependency_versions,
        };

        let mut children = Vec::with_capacity(manifest.dependencies.len());
        for dependency in &manifest.dependencies {
            let child = match dependency.source_type {
                SourceType::Git => self.git_dependency(&dependency.name, &dependency.source, pins),
                SourceType::File => {
                    self.file_dependency(&dependency.name, &dependency.source, pins)
                }
            }?;
            children.push(child);
        }

        let source = manifest.source.clone().or_else(|| source_key.clone());
        let revision = source.as_ref().and_then(|s| pins.get(s)).cloned();
        let build_steps = parse_steps(name, manifest_path, manifest.build_steps)?;

        self.nodes.push(Definition {
            name: name.to_string(),
            source,
            source_key,
            revision,
            build_steps,
            needed_variables: manifest.needed_variables,
            children,
        });
        Ok(DefId(self.nodes.len() - 1))
    }

    fn git_dependency(
        &mut self,
        name: &str,
        source: &str,
        pins: &HashMap<String, String>,
    ) -> Result<DefId> {
        self.git.ensure_repository(source)?;
        let revision = pins.get(source).ok_or_else(|| Error::MissingRevision {
            package: source.to_string(),
        })?;
        let cached_dir = self.store.manifest_cache_dir(source, revision);
        self.store.ensure_dir(&cached_dir)?;
        let cached_manifest = cached_dir.join("depeche.json");
        if !cached_manifest.exists() {
            self.git.checkout_subtree(
                &self.store.repository_cache_path(source),
                &cached_dir,
                revision,
                &["depeche.json"],
            )?;
        }
        self.build_node(name, &cached_manifest, Some(source.to_string()), Some(pins))
    }

    fn file_dependency(
        &mut self,
        name: &str,
        path: &str,
        pins: &HashMap<String, String>,
    ) -> Result<DefId> {
        let path = Path::new(path);
        let contents = fs::read_to_string(path).map_err(|err| Error::ManifestParse {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: format!("couldn't read dependency file: {err}"),
        })?;

        // The file's contents are its identity.
        let id = Ident::compute(contents.as_bytes());
        let cached_dir = self.store.file_cache_dir(&id);
        self.store.ensure_dir(&cached_dir)?;
        let cached_manifest = cached_dir.join("depeche.json");
        if !cached_manifest.exists() {
            fs::write(&cached_manifest, &contents).map_err(|source| Error::Filesystem {
                path: cached_manifest.clone(),
                source,
            })?;
        }
        self.build_node(name, &cached_manifest, Some(id.to_string()), Some(pins))
    }
}

fn parse_steps(name: &str, path: &Path, steps: Vec<BuildStep>) -> Result<Vec<Step>> {
    steps
        .into_iter()
        .map(|step| match step {
            BuildStep::Command(command) => Ok(Step::Command(command)),
            BuildStep::Group(group) => {
                let condition = group
                    .condition
                    .map(|text| {
                        Expr::parse(&text).map_err(|reason| Error::ManifestParse {
                            name: name.to_string(),
                            path: path.to_path_buf(),
                            reason: format!("invalid condition {text:?}: {reason}"),
                        })
                    })
                    .transpose()?;
                Ok(Step::Group {
                    commands: group.commands,
                    condition,
                })
            }
        })
        .collect()
}
