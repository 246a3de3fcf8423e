//! Build orchestration: bottom-up install over a definition tree.
//!
//! Each non-root definition moves through a small state machine: absent,
//! in progress (install root created but empty, build directory alive),
//! installed (install root populated, build directory removed). Any
//! failure while recipe commands run collapses the entry back to absent
//! by removing the install root, so a half-built directory is never
//! mistaken for a cached install.
//!
//! Recipe commands run with the working directory inside the build
//! checkout and the process environment overlaid with the variable map.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::expr::UnknownName;
use crate::git::GitClient;
use crate::graph::{DefId, Definition, DefinitionTree, Step};
use crate::manifest::CommandStep;
use crate::store::CacheStore;
use crate::vars;

/// Installs every dependency of a [`DefinitionTree`], children first.
#[derive(Debug)]
pub struct Builder<'a> {
    store: &'a CacheStore,
    /// Variables loaded from the sidecar environment file.
    environment: &'a HashMap<String, String>,
    /// Fail instead of clearing an existing build directory.
    keep: bool,
    /// Install roots of the definitions handled this run.
    roots: HashMap<DefId, PathBuf>,
}

impl<'a> Builder<'a> {
    /// Create a builder over `store` with the sidecar `environment`.
    pub fn new(store: &'a CacheStore, environment: &'a HashMap<String, String>, keep: bool) -> Self {
        Self {
            store,
            environment,
            keep,
            roots: HashMap::new(),
        }
    }

    /// Install the whole tree in post order. The root project itself is
    /// never built; only its transitive dependencies are.
    pub fn install(&mut self, tree: &DefinitionTree, git: &mut GitClient<'_>) -> Result<()> {
        self.install_node(tree, tree.root(), git)
    }

    /// Name and install root of each of the root's direct dependencies,
    /// in manifest order. Only meaningful after [`Builder::install`].
    pub fn dependency_roots(&self, tree: &DefinitionTree) -> Vec<(String, PathBuf)> {
        tree.node(tree.root())
            .children
            .iter()
            .map(|&child| {
                let def = tree.node(child);
                let root = self
                    .roots
                    .get(&child)
                    .expect("install() records every direct dependency root");
                (def.name.clone(), root.clone())
            })
            .collect()
    }

    fn install_node(
        &mut self,
        tree: &DefinitionTree,
        id: DefId,
        git: &mut GitClient<'_>,
    ) -> Result<()> {
        let def = tree.node(id);
        for &child in &def.children {
            self.install_node(tree, child, git)?;
        }
        let Some(source_key) = def.source_key.as_deref() else {
            // the product itself
            return Ok(());
        };
        let source = def.source.as_deref().unwrap_or(source_key);
        debug!("Checking for {source}");

        let mut variables = vars::assemble(def, tree, &self.roots, self.environment)?;
        let vars_hash = vars::fingerprint(&variables);
        let Some(revision) = def.revision.as_deref() else {
            error!("No version defined for {source}");
            return Err(Error::MissingRevision {
                package: source.to_string(),
            });
        };
        let install_root = self.store.root_path(source_key, revision, vars_hash.as_str());
        variables.insert(
            "INSTALL_ROOT".to_string(),
            install_root.to_string_lossy().into_owned(),
        );
        self.roots.insert(id, install_root.clone());

        if install_root.exists() {
            debug!(
                "Checking if {source}/{revision} exists in {}: true",
                install_root.display()
            );
            return Ok(());
        }
        git.ensure_repository(source)?;
        info!("Building {}", def.name);
        self.build_definition(def, source, revision, &variables, &install_root, git)
    }

    fn build_definition(
        &self,
        def: &Definition,
        source: &str,
        revision: &str,
        variables: &BTreeMap<String, String>,
        install_root: &Path,
        git: &mut GitClient<'_>,
    ) -> Result<()> {
        let build_path = self.store.build_path(install_root);
        debug!(
            "Building {source} into {} using {}",
            install_root.display(),
            build_path.display()
        );
        if build_path.exists() {
            if self.keep {
                error!("Path already exists: {}", build_path.display());
                return Err(Error::CacheCollision { path: build_path });
            }
            self.store.safe_remove(&build_path)?;
        }
        self.store.ensure_dir(&build_path)?;
        git.checkout_subtree(
            &self.store.repository_cache_path(source),
            &build_path,
            revision,
            &[],
        )?;
        self.store.ensure_dir(install_root)?;

        if let Err(err) = self.run_recipe(def, variables, &build_path) {
            // collapse the half-built entry back to absent
            if let Err(remove_err) = self.store.safe_remove(install_root) {
                error!(
                    "Couldn't clean up {}: {remove_err}",
                    install_root.display()
                );
            }
            return Err(err);
        }
        self.store.safe_remove(&build_path)
    }

    fn run_recipe(
        &self,
        def: &Definition,
        variables: &BTreeMap<String, String>,
        build_path: &Path,
    ) -> Result<()> {
        for step in expand_recipe(def, variables)? {
            run_command(step, variables, build_path)?;
        }
        Ok(())
    }
}

/// Flatten the recipe into the command steps to run, evaluating group
/// conditions against the variable map with built-ins hidden.
fn expand_recipe<'d>(
    def: &'d Definition,
    variables: &BTreeMap<String, String>,
) -> Result<Vec<&'d CommandStep>> {
    let scope = vars::condition_scope(variables);
    let mut steps = Vec::new();
    for step in &def.build_steps {
        match step {
            Step::Command(command) => steps.push(command),
            Step::Group {
                commands,
                condition,
            } => {
                let included = match condition {
                    Some(expr) => expr
                        .eval(&scope)
                        .map_err(|UnknownName(variable)| Error::MissingVariable {
                            name: def.name.clone(),
                            variable,
                        })?
                        .truthy(),
                    None => true,
                };
                if included {
                    steps.extend(commands.iter());
                }
            }
        }
    }
    Ok(steps)
}

fn run_command(
    step: &CommandStep,
    variables: &BTreeMap<String, String>,
    build_path: &Path,
) -> Result<()> {
    let mut tokens = Vec::with_capacity(step.command.len());
    for word in &step.command {
        let mut token = word.clone();
        for (key, value) in variables {
            token = token.replace(&format!("%%{key}%%"), value);
        }
        if token.contains("%%") {
            error!("Unsubstituted parameter {token}");
            return Err(Error::UnsubstitutedToken { token });
        }
        tokens.push(token);
    }
    let cwd = match step.path.as_deref() {
        Some(path) => build_path.join(path),
        None => build_path.to_path_buf(),
    };
    debug!("Running {tokens:?} in {}", cwd.display());
    let build_err = |cause: String| Error::Build {
        args: tokens.clone(),
        cwd: cwd.clone(),
        cause,
    };
    let (program, args) = tokens
        .split_first()
        .ok_or_else(|| build_err("empty command".to_string()))?;
    let status = Command::new(program)
        .args(args)
        .envs(variables)
        .current_dir(&cwd)
        .status()
        .map_err(|err| build_err(err.to_string()))?;
    if !status.success() {
        return Err(build_err(match status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }));
    }
    Ok(())
}
