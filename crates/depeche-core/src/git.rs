//! Adapter around the external `git` binary.
//!
//! Every source seen by the resolver is cached as a pair: a bare clone
//! under `repositories/<id>/` that all checkouts read from, and a working
//! checkout under `work/<id>/` registered on the bare clone as a remote
//! named `work`. Commits made in the working checkout are picked up on
//! the next run because the bare clone fetches `work` before use, so a
//! dependency can be hacked on locally without pushing upstream.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::store::CacheStore;

/// Client for clone, fetch, and worktree-checkout operations.
#[derive(Debug)]
pub struct GitClient<'a> {
    store: &'a CacheStore,
    /// Repositories already fetched from origin this run.
    updated: HashSet<PathBuf>,
}

impl<'a> GitClient<'a> {
    /// Create a client over `store`.
    pub fn new(store: &'a CacheStore) -> Self {
        Self {
            store,
            updated: HashSet::new(),
        }
    }

    /// Make sure the bare/working pair for `source` exists.
    ///
    /// An already-cached repository fetches its `work` remote so local
    /// edits reach the bare clone. A fresh source is cloned bare, has its
    /// origin fetch refspec widened to all branches, gets a working
    /// checkout, and has that checkout added as the `work` remote. If any
    /// of those steps fails, both halves are removed before the error
    /// propagates.
    pub fn ensure_repository(&mut self, source: &str) -> Result<()> {
        let bare = self.store.repository_cache_path(source);
        debug!("Checking for cache of repository {source} in {}", bare.display());
        if bare.exists() {
            return self.run(&["fetch", "work"], &bare);
        }
        let work = self.store.repository_working_path(source);
        debug!("Cloning {source}");
        if let Err(err) = self.clone_pair(source, &bare, &work) {
            error!("Couldn't clone {source} into {}: {err}", bare.display());
            self.store.safe_remove(&bare)?;
            self.store.safe_remove(&work)?;
            return Err(err);
        }
        Ok(())
    }

    fn clone_pair(&self, source: &str, bare: &Path, work: &Path) -> Result<()> {
        let home = self.store.home();
        let bare_path = bare.to_string_lossy();
        let work_path = work.to_string_lossy();
        self.run(&["clone", "--bare", source, bare_path.as_ref()], home)?;
        self.run(
            &[
                "config",
                "remote.origin.fetch",
                "+refs/heads/*:refs/remotes/origin/*",
            ],
            bare,
        )?;
        self.run(&["clone", source, work_path.as_ref()], home)?;
        self.run(&["remote", "add", "work", work_path.as_ref()], bare)?;
        Ok(())
    }

    /// Fetch `origin` in the repository at `path`, at most once per run.
    pub fn update_repository_at(&mut self, path: &Path) -> Result<()> {
        if !self.updated.insert(path.to_path_buf()) {
            return Ok(());
        }
        debug!("Updating git repo in {}", path.display());
        self.run(&["fetch", "origin"], path)
    }

    /// Fetch `origin` in every cached bare clone (the `--master` flag).
    pub fn update_all_repositories(&mut self) -> Result<()> {
        let repos = self.store.repositories();
        debug!("Updating all repositories in {}", repos.display());
        let entries = fs::read_dir(repos).map_err(|source| Error::Filesystem {
            path: repos.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::Filesystem {
                path: repos.to_path_buf(),
                source,
            })?;
            self.update_repository_at(&entry.path())?;
        }
        Ok(())
    }

    /// Materialize `revision`'s tree from the bare clone at `repo` into
    /// `destination`, restricted to `paths` when non-empty.
    ///
    /// On failure the repository is fetched once and the checkout retried;
    /// a second failure removes `destination` and propagates.
    pub fn checkout_subtree(
        &mut self,
        repo: &Path,
        destination: &Path,
        revision: &str,
        paths: &[&str],
    ) -> Result<()> {
        debug!(
            "Checking out subtree of {} in {} version {revision}",
            repo.display(),
            destination.display()
        );
        let Err(err) = self.checkout(repo, destination, revision, paths) else {
            return Ok(());
        };
        info!("Checkout failed ({err}), trying to update repository first");
        self.update_repository_at(repo)?;
        if let Err(err) = self.checkout(repo, destination, revision, paths) {
            error!(
                "Couldn't checkout {} into {}: {err}",
                repo.display(),
                destination.display()
            );
            self.store.safe_remove(destination)?;
            return Err(err);
        }
        Ok(())
    }

    fn checkout(
        &self,
        repo: &Path,
        destination: &Path,
        revision: &str,
        paths: &[&str],
    ) -> Result<()> {
        let work_tree = format!("--work-tree={}", destination.display());
        let mut args = vec![work_tree.as_str(), "checkout", revision, "--"];
        if paths.is_empty() {
            args.push(".");
        } else {
            args.extend_from_slice(paths);
        }
        self.run(&args, repo)
    }

    fn run(&self, args: &[&str], cwd: &Path) -> Result<()> {
        debug!("Running git {args:?} in {}", cwd.display());
        let vcs_err = |cause: String| Error::Vcs {
            args: args.iter().map(ToString::to_string).collect(),
            cwd: cwd.to_path_buf(),
            cause,
        };
        let status = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .status()
            .map_err(|err| vcs_err(err.to_string()))?;
        if status.success() {
            return Ok(());
        }
        Err(vcs_err(match status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }))
    }
}
