//! External element identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Application-facing identity of a node or edge.
///
/// Opaque to the store: it is only hashed and compared. Distinct from the
/// dense arena index (`store_id`) the store assigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
    Int(i64),
    Str(String),
}

impl ElementId {
    /// An empty string names nothing and is refused by the stores.
    pub fn is_absent(&self) -> bool {
        matches!(self, ElementId::Str(s) if s.is_empty())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Int(i) => write!(f, "{i}"),
            ElementId::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ElementId { fn from(v: i64) -> Self { ElementId::Int(v) } }
impl From<i32> for ElementId { fn from(v: i32) -> Self { ElementId::Int(v as i64) } }
impl From<u32> for ElementId { fn from(v: u32) -> Self { ElementId::Int(v as i64) } }
impl From<usize> for ElementId { fn from(v: usize) -> Self { ElementId::Int(v as i64) } }
impl From<String> for ElementId { fn from(v: String) -> Self { ElementId::Str(v) } }
impl From<&str> for ElementId { fn from(v: &str) -> Self { ElementId::Str(v.to_owned()) } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(ElementId::from(7), ElementId::Int(7));
        assert_eq!(ElementId::from("a"), ElementId::Str("a".into()));
        assert_eq!(ElementId::from(3usize).to_string(), "3");
    }

    #[test]
    fn test_absent() {
        assert!(ElementId::from("").is_absent());
        assert!(!ElementId::from(0).is_absent());
    }

    #[test]
    fn test_serde_untagged() {
        let ids: Vec<ElementId> = serde_json::from_str(r#"[1, "x"]"#).unwrap();
        assert_eq!(ids, vec![ElementId::Int(1), ElementId::Str("x".into())]);
    }
}
