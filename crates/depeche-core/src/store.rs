//! On-disk cache layout under `DEPECHE_HOME`.
//!
//! ```text
//! ~/.depeche/
//! ├── repositories/   # bare clones, one per source URL
//! ├── work/           # working checkouts wired into the bare clones
//! ├── roots/          # cached manifests and install roots
//! └── tmp/            # transient build directories
//! ```
//!
//! Every path handed to [`CacheStore::safe_remove`] must lie inside the
//! cache home; anything else is logged and left alone. That containment
//! check is the single barrier between a path-computation bug and user
//! data.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::ident::Ident;

/// Owner of the four cache roots.
#[derive(Debug, Clone)]
pub struct CacheStore {
    home: PathBuf,
    repositories: PathBuf,
    work: PathBuf,
    roots: PathBuf,
    tmp: PathBuf,
}

impl CacheStore {
    /// Open the cache under `home`, creating any missing root directory.
    ///
    /// Create failures are logged but not fatal; later operations on the
    /// affected root surface the real error.
    pub fn open(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let store = Self {
            repositories: home.join("repositories"),
            work: home.join("work"),
            roots: home.join("roots"),
            tmp: home.join("tmp"),
            home,
        };
        for root in [
            &store.repositories,
            &store.work,
            &store.roots,
            &store.tmp,
        ] {
            if !root.exists() {
                debug!("Creating {}", root.display());
                if let Err(err) = fs::create_dir_all(root) {
                    error!("Failed creating or testing {}: {err}", root.display());
                }
            }
        }
        store
    }

    /// Open the cache named by `DEPECHE_HOME`, defaulting to `~/.depeche`.
    pub fn from_env() -> Self {
        let home = std::env::var_os("DEPECHE_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".depeche")))
            .unwrap_or_else(|| PathBuf::from(".depeche"));
        Self::open(home)
    }

    /// The cache home itself.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The directory of bare clones.
    pub fn repositories(&self) -> &Path {
        &self.repositories
    }

    /// Bare clone cache directory for a repository URL.
    pub fn repository_cache_path(&self, source: &str) -> PathBuf {
        self.repositories
            .join(Ident::compute(source.as_bytes()).as_str())
    }

    /// Working checkout directory for a repository URL.
    pub fn repository_working_path(&self, source: &str) -> PathBuf {
        self.work.join(Ident::compute(source.as_bytes()).as_str())
    }

    /// Install root for (source key, revision, variable fingerprint).
    pub fn root_path(&self, source_key: &str, revision: &str, vars_hash: &str) -> PathBuf {
        self.roots
            .join(Ident::compute(source_key.as_bytes()).as_str())
            .join(revision)
            .join(vars_hash)
    }

    /// Per-revision manifest cache directory for a git dependency.
    pub fn manifest_cache_dir(&self, source: &str, revision: &str) -> PathBuf {
        self.roots
            .join(Ident::compute(source.as_bytes()).as_str())
            .join(revision)
    }

    /// Content-addressed cache directory for a file dependency.
    pub fn file_cache_dir(&self, id: &Ident) -> PathBuf {
        self.roots.join(id.as_str())
    }

    /// Transient build directory keyed by the install-root path.
    pub fn build_path(&self, install_root: &Path) -> PathBuf {
        self.tmp
            .join(Ident::compute(install_root.to_string_lossy().as_bytes()).as_str())
    }

    /// Create `path` if it does not exist yet.
    pub fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            debug!("Creating {}", path.display());
            fs::create_dir_all(path).map_err(|source| Error::Filesystem {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Recursively delete `path`, but only when it lies inside the cache
    /// home. Requests for anything else are logged and skipped.
    pub fn safe_remove(&self, path: &Path) -> Result<()> {
        if !path.starts_with(&self.home) {
            error!(
                "Not removing {}: outside the cache home {}",
                path.display(),
                self.home.display()
            );
            return Ok(());
        }
        if !path.exists() {
            return Ok(());
        }
        info!("Removing directory {}", path.display());
        fs::remove_dir_all(path).map_err(|source| Error::Filesystem {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_all_roots() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::open(tmp.path().join("cache"));
        for root in ["repositories", "work", "roots", "tmp"] {
            assert!(store.home().join(root).is_dir(), "{root} missing");
        }
    }

    #[test]
    fn open_is_idempotent() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("cache");
        CacheStore::open(&home);
        let store = CacheStore::open(&home);
        assert!(store.repositories().is_dir());
    }

    #[test]
    fn paths_are_keyed_by_sha1() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::open(tmp.path().join("cache"));
        let source = "https://example.test/lib.git";
        let id = Ident::compute(source.as_bytes());

        assert_eq!(
            store.repository_cache_path(source),
            store.home().join("repositories").join(id.as_str())
        );
        assert_eq!(
            store.repository_working_path(source),
            store.home().join("work").join(id.as_str())
        );
        assert_eq!(
            store.root_path(source, "abc123", "feed"),
            store
                .home()
                .join("roots")
                .join(id.as_str())
                .join("abc123")
                .join("feed")
        );
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::open(tmp.path().join("cache"));
        let dir = store.home().join("roots/nested/dir");
        store.ensure_dir(&dir).unwrap();
        store.ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn safe_remove_refuses_paths_outside_the_cache() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::open(tmp.path().join("cache"));

        let outside = tmp.path().join("other");
        std::fs::create_dir_all(outside.join("data")).unwrap();
        std::fs::write(outside.join("data/file"), "precious").unwrap();

        store.safe_remove(&outside).unwrap();
        assert!(outside.join("data/file").exists());
    }

    #[test]
    fn safe_remove_deletes_inside_the_cache() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::open(tmp.path().join("cache"));

        let dir = store.home().join("tmp/deadbeef");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub/file"), "scratch").unwrap();

        store.safe_remove(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn safe_remove_of_missing_path_is_ok() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::open(tmp.path().join("cache"));
        store.safe_remove(&store.home().join("tmp/nothing")).unwrap();
    }
}
