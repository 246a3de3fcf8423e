//! Generated CMake include file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Write the include file exporting one `<NAME>_ROOT` variable per
/// direct dependency and prepending each install root to
/// `CMAKE_MODULE_PATH`.
///
/// Entries whose uppercased name contains `CMAKE` are hoisted to the
/// front of the list: each emitted line inserts at position 0, so the
/// first entry ends up last in the module search order, letting project
/// CMake modules win over a dependency that ships its own.
pub fn write_cmake_file(path: &Path, dependency_roots: &[(String, PathBuf)]) -> Result<()> {
    debug!("Writing cmake file {}", path.display());
    let fs_err = |source| Error::Filesystem {
        path: path.to_path_buf(),
        source,
    };

    let mut ordered: Vec<_> = dependency_roots.iter().collect();
    ordered.sort_by_key(|(name, _)| !name.to_uppercase().contains("CMAKE"));

    let mut file = File::create(path).map_err(fs_err)?;
    for (name, root) in &ordered {
        writeln!(file, "SET({}_ROOT {})", name.to_uppercase(), root.display()).map_err(fs_err)?;
    }
    for (_, root) in &ordered {
        writeln!(
            file,
            "list(INSERT CMAKE_MODULE_PATH 0 \"{}\")",
            root.display()
        )
        .map_err(fs_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn roots(pairs: &[(&str, &str)]) -> Vec<(String, PathBuf)> {
        pairs
            .iter()
            .map(|(name, root)| ((*name).to_string(), PathBuf::from(root)))
            .collect()
    }

    #[test]
    fn no_dependencies_emits_an_empty_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("CMakeLists-depeche.txt");
        write_cmake_file(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn set_lines_then_insert_lines() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("CMakeLists-depeche.txt");
        write_cmake_file(&path, &roots(&[("Lib", "/r/lib"), ("Zlib", "/r/zlib")])).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "SET(LIB_ROOT /r/lib)\n\
             SET(ZLIB_ROOT /r/zlib)\n\
             list(INSERT CMAKE_MODULE_PATH 0 \"/r/lib\")\n\
             list(INSERT CMAKE_MODULE_PATH 0 \"/r/zlib\")\n"
        );
    }

    #[test]
    fn cmake_named_dependency_is_hoisted_first() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("CMakeLists-depeche.txt");
        write_cmake_file(&path, &roots(&[("foo", "/r/foo"), ("cmake", "/r/cmake")])).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "SET(CMAKE_ROOT /r/cmake)");
        assert_eq!(lines[1], "SET(FOO_ROOT /r/foo)");
        assert_eq!(lines[2], "list(INSERT CMAKE_MODULE_PATH 0 \"/r/cmake\")");
        assert_eq!(lines[3], "list(INSERT CMAKE_MODULE_PATH 0 \"/r/foo\")");
    }

    #[test]
    fn hoist_keeps_remaining_declaration_order() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("CMakeLists-depeche.txt");
        write_cmake_file(
            &path,
            &roots(&[("b", "/r/b"), ("a", "/r/a"), ("CMakeHelpers", "/r/cm")]),
        )
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "SET(CMAKEHELPERS_ROOT /r/cm)");
        assert_eq!(lines[1], "SET(B_ROOT /r/b)");
        assert_eq!(lines[2], "SET(A_ROOT /r/a)");
    }
}
