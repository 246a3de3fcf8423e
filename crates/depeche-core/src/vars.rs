//! Per-definition substitution variables.
//!
//! The variable map drives `%%NAME%%` substitution in recipe tokens, the
//! overlay environment of recipe subprocesses, and — through its
//! fingerprint — the install-root path, so builds with different
//! effective inputs never collide.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::graph::{DefId, Definition, DefinitionTree};
use crate::ident::{Ident, serialize_vars};

/// Names injected by the builder rather than the environment file.
/// Conditions cannot see them.
pub const BUILTIN_VARS: &[&str] = &["FULL_INSTALL", "INSTALL_ROOT"];

/// `<NAME>_ROOT` entries for the direct children of `def`.
pub fn dependency_roots(
    def: &Definition,
    tree: &DefinitionTree,
    install_roots: &HashMap<DefId, PathBuf>,
) -> BTreeMap<String, String> {
    let mut roots = BTreeMap::new();
    for &child in &def.children {
        let name = &tree.node(child).name;
        let root = install_roots
            .get(&child)
            .expect("children are installed before their parent");
        roots.insert(
            format!("{}_ROOT", name.to_uppercase()),
            root.to_string_lossy().into_owned(),
        );
    }
    roots
}

/// Assemble the substitution map for `def`: dependency roots, the needed
/// variables resolved from the sidecar environment, and `FULL_INSTALL`.
/// `INSTALL_ROOT` is added by the builder after fingerprinting.
pub fn assemble(
    def: &Definition,
    tree: &DefinitionTree,
    install_roots: &HashMap<DefId, PathBuf>,
    environment: &HashMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut vars = dependency_roots(def, tree, install_roots);
    for variable in &def.needed_variables {
        let value = environment
            .get(variable)
            .ok_or_else(|| Error::MissingVariable {
                name: def.name.clone(),
                variable: variable.clone(),
            })?;
        vars.insert(variable.clone(), value.clone());
    }
    vars.insert("FULL_INSTALL".to_string(), "True".to_string());
    Ok(vars)
}

/// Fingerprint of the map before `INSTALL_ROOT` is added, so the
/// install-root path cannot circularly perturb its own key.
pub fn fingerprint(vars: &BTreeMap<String, String>) -> Ident {
    Ident::compute(serialize_vars(vars).as_bytes())
}

/// The map as seen by condition expressions: built-ins removed.
pub fn condition_scope(vars: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut scope = vars.clone();
    for name in BUILTIN_VARS {
        scope.remove(*name);
    }
    scope
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn fingerprint_is_stable_across_insertion_order() {
        let a = map(&[("FULL_INSTALL", "True"), ("TOOLCHAIN", "gcc")]);
        let mut b = BTreeMap::new();
        b.insert("TOOLCHAIN".to_string(), "gcc".to_string());
        b.insert("FULL_INSTALL".to_string(), "True".to_string());
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_is_sensitive_to_values() {
        let gcc = map(&[("FULL_INSTALL", "True"), ("TOOLCHAIN", "gcc")]);
        let clang = map(&[("FULL_INSTALL", "True"), ("TOOLCHAIN", "clang")]);
        assert_ne!(fingerprint(&gcc), fingerprint(&clang));
    }

    #[test]
    fn condition_scope_hides_builtins() {
        let vars = map(&[
            ("FULL_INSTALL", "True"),
            ("INSTALL_ROOT", "/somewhere"),
            ("TOOLCHAIN", "gcc"),
        ]);
        let scope = condition_scope(&vars);
        assert!(!scope.contains_key("FULL_INSTALL"));
        assert!(!scope.contains_key("INSTALL_ROOT"));
        assert!(scope.contains_key("TOOLCHAIN"));
    }
}
