//! Logical resource identifiers.
//!
//! A logical id names a resource inside one stack. It is derived from the
//! construct path so it stays stable across builds; the physical name is
//! assigned later by the provisioning engine.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters of the path hash appended to a logical id.
const HASH_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Allocate a logical id for the construct at `path` (components below
    /// the stack root, e.g. `["LambdaFunction", "ServiceRole"]`).
    ///
    /// The readable part is the alphanumeric characters of every component;
    /// the suffix is the first eight uppercase hex digits of the SHA-256 of
    /// the `/`-joined path, so distinct paths never collapse onto one id.
    pub fn allocate(path: &[&str]) -> Self {
        let readable: String = path
            .iter()
            .flat_map(|c| c.chars())
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let digest = Sha256::digest(path.join("/").as_bytes());
        let hash = format!("{:X}", digest);
        LogicalId(format!("{}{}", readable, &hash[..HASH_LEN]))
    }

    /// Wrap an id read back from a template. Only ASCII alphanumerics are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(LogicalId(raw.to_owned()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_stable() {
        let a = LogicalId::allocate(&["VisitorTimeTable"]);
        let b = LogicalId::allocate(&["VisitorTimeTable"]);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("VisitorTimeTable"));
        assert_eq!(a.as_str().len(), "VisitorTimeTable".len() + HASH_LEN);
    }

    #[test]
    fn test_allocate_distinguishes_paths_with_same_characters() {
        let a = LogicalId::allocate(&["Lambda", "Function"]);
        let b = LogicalId::allocate(&["LambdaFunction"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_allocate_strips_non_alphanumerics() {
        let id = LogicalId::allocate(&["LambdaFunction", "invoke-function-url"]);
        assert!(id.as_str().starts_with("LambdaFunctioninvokefunctionurl"));
    }

    #[test]
    fn test_parse_rejects_punctuation() {
        assert!(LogicalId::parse("Table1234").is_some());
        assert!(LogicalId::parse("Table-1").is_none());
        assert!(LogicalId::parse("").is_none());
    }
}
