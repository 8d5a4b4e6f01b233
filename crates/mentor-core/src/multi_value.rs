//! Normalization for multi-valued fields.
//!
//! Collections, skills, regions and SIRH identifiers arrive either as a
//! single comma-joined string or as a list of strings. They are reduced to
//! one canonical list (trimmed, empty items dropped, first occurrence kept)
//! and stored comma-joined.

use serde::{Deserialize, Serialize};

/// A multi-valued input as callers hand it over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiValue {
    Joined(String),
    List(Vec<String>),
}

impl MultiValue {
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::Joined(raw) => parse_multi_value(std::iter::once(raw.as_str())),
            Self::List(items) => parse_multi_value(items.iter().map(String::as_str)),
        }
    }

    pub fn joined(&self) -> String {
        self.values().join(",")
    }
}

impl From<&str> for MultiValue {
    fn from(value: &str) -> Self {
        Self::Joined(value.to_string())
    }
}

impl From<String> for MultiValue {
    fn from(value: String) -> Self {
        Self::Joined(value)
    }
}

impl From<Vec<String>> for MultiValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for MultiValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(String::from).collect())
    }
}

/// Split every input on commas and return the canonical list.
pub fn parse_multi_value<'a>(inputs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for input in inputs {
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() || out.iter().any(|v| v == part) {
                continue;
            }
            out.push(part.to_string());
        }
    }
    out
}

/// Parse a stored comma-joined value.
pub fn split_joined(stored: &str) -> Vec<String> {
    parse_multi_value(std::iter::once(stored))
}

/// Order-insensitive equality of two multi-valued inputs.
pub fn same_values(a: &MultiValue, b: &MultiValue) -> bool {
    let mut left = a.values();
    let mut right = b.values();
    left.sort();
    right.sort();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_and_list_inputs_normalize_identically() {
        let joined = MultiValue::from("accompagnement, management ,,accompagnement");
        let list = MultiValue::from(vec!["accompagnement", "management", " "]);
        assert_eq!(joined.values(), vec!["accompagnement", "management"]);
        assert_eq!(joined.values(), list.values());
        assert_eq!(list.joined(), "accompagnement,management");
    }

    #[test]
    fn list_items_containing_commas_are_split() {
        let list = MultiValue::from(vec!["a,b", "c"]);
        assert_eq!(list.values(), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_inputs_yield_empty_list() {
        assert!(MultiValue::from("").values().is_empty());
        assert!(MultiValue::List(vec![]).values().is_empty());
        assert_eq!(MultiValue::from("").joined(), "");
    }

    #[test]
    fn same_values_ignores_order_and_representation() {
        let a = MultiValue::from("Paris,Lyon");
        let b = MultiValue::from(vec!["Lyon", "Paris"]);
        let c = MultiValue::from("Paris");
        assert!(same_values(&a, &b));
        assert!(!same_values(&a, &c));
    }

    #[test]
    fn deserializes_from_string_or_array() {
        let s: MultiValue = serde_json::from_str("\"x,y\"").unwrap();
        let l: MultiValue = serde_json::from_str("[\"x\",\"y\"]").unwrap();
        assert_eq!(s.values(), l.values());
    }
}
