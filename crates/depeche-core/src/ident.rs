//! Content-addressed identity for cache entries.

use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// A cache identifier: the SHA-1 of an identifying byte sequence,
/// rendered as 40 lowercase hex characters.
///
/// Identifiers name repository cache directories (from the source URL),
/// file-dependency directories (from the manifest contents), variable
/// fingerprints (from the serialized variable map), and transient build
/// directories (from the install-root path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Compute the identifier for `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self(hex::encode(Sha1::digest(data)))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical serialization of a variable map: keys in ascending order,
/// each rendered as `key-/-value`, concatenated without separators.
/// Two maps with the same entries serialize identically regardless of
/// how they were built.
pub fn serialize_vars(vars: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in vars {
        out.push_str(key);
        out.push_str("-/-");
        out.push_str(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_known_vector() {
        let id = Ident::compute(b"hello");
        assert_eq!(id.as_str(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn sha1_empty_input() {
        let id = Ident::compute(b"");
        assert_eq!(id.as_str(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn ident_shape() {
        let id = Ident::compute(b"https://example.test/lib.git");
        assert_eq!(id.as_str().len(), 40);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn ident_deterministic() {
        assert_eq!(Ident::compute(b"same input"), Ident::compute(b"same input"));
        assert_ne!(Ident::compute(b"input 1"), Ident::compute(b"input 2"));
    }

    #[test]
    fn serialize_is_insertion_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("ZLIB_ROOT".to_string(), "/r/z".to_string());
        a.insert("FULL_INSTALL".to_string(), "True".to_string());

        let mut b = BTreeMap::new();
        b.insert("FULL_INSTALL".to_string(), "True".to_string());
        b.insert("ZLIB_ROOT".to_string(), "/r/z".to_string());

        assert_eq!(serialize_vars(&a), serialize_vars(&b));
        assert_eq!(serialize_vars(&a), "FULL_INSTALL-/-TrueZLIB_ROOT-/-/r/z");
    }
}
