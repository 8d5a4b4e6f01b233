//! Collection catalog.
//!
//! Collections are configured as one `tag|Label|#color` entry per line.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDef {
    pub tag: String,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionCatalog {
    entries: Vec<CollectionDef>,
}

impl CollectionCatalog {
    pub fn new(entries: Vec<CollectionDef>) -> Self {
        Self { entries }
    }

    /// Parse the line format. Blank lines and lines without a tag are
    /// skipped; a missing label falls back to the tag.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .lines()
            .filter_map(|line| {
                let mut parts = line.split('|').map(str::trim);
                let tag = parts.next().filter(|t| !t.is_empty())?;
                let label = parts.next().filter(|l| !l.is_empty()).unwrap_or(tag);
                let color = parts.next().unwrap_or_default();
                Some(CollectionDef {
                    tag: tag.to_string(),
                    label: label.to_string(),
                    color: color.to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CollectionDef] {
        &self.entries
    }

    pub fn get(&self, tag: &str) -> Option<&CollectionDef> {
        self.entries
            .iter()
            .find(|entry| entry.tag.eq_ignore_ascii_case(tag))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }
}

pub const DEFAULT_COLLECTIONS: &str = "\
accompagnement|Accompagnement des transformations|#CECECE
management|Management|#FFE4C4
numerique|Transformation numérique|#B0E0E6
relationusagers|Relation aux usagers|#F5DEB3
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_format() {
        let catalog = CollectionCatalog::parse("a|Alpha|#fff\n\n b | Beta \n|orphan|#000\n");
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(catalog.get("a").unwrap().color, "#fff");
        assert_eq!(catalog.get("b").unwrap().label, "Beta");
        assert_eq!(catalog.get("b").unwrap().color, "");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = CollectionCatalog::parse(DEFAULT_COLLECTIONS);
        assert!(catalog.contains("MANAGEMENT"));
        assert!(!catalog.contains("unknown"));
    }
}
