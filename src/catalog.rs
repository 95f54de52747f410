//! Vocabulary records supplied by the data-loading layer.
//!
//! The catalog arrives already filtered; only the id and the two directional
//! text fields matter to a session.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Card;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate vocabulary id: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: String,
    /// Text in language A
    pub prompt_a: String,
    /// Text in language B
    pub prompt_b: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl From<&VocabularyItem> for Card {
    fn from(item: &VocabularyItem) -> Self {
        Card::new(item.id.clone(), item.prompt_a.clone(), item.prompt_b.clone())
    }
}

/// Parse a JSON array of vocabulary records
pub fn parse_catalog(content: &str) -> Result<Vec<VocabularyItem>, CatalogError> {
    let items: Vec<VocabularyItem> = serde_json::from_str(content)?;

    let mut seen = std::collections::HashSet::new();
    for item in &items {
        if !seen.insert(item.id.as_str()) {
            return Err(CatalogError::DuplicateId(item.id.clone()));
        }
    }

    Ok(items)
}

pub fn load_catalog(path: &Path) -> Result<Vec<VocabularyItem>, CatalogError> {
    let content = fs::read_to_string(path)?;
    parse_catalog(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;

    #[test]
    fn test_parse_catalog() {
        let items = parse_catalog(
            r#"[
                {"id": "kotka", "promptA": "котка", "promptB": "Katze", "metadata": {"level": "A1"}},
                {"id": "kniga", "promptA": "книга", "promptB": "Buch"}
            ]"#,
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].metadata["level"], "A1");

        let card = Card::from(&items[1]);
        assert_eq!(card.prompt(Direction::AToB), "книга");
        assert_eq!(card.answer(Direction::AToB), "Buch");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = parse_catalog(
            r#"[
                {"id": "kotka", "promptA": "котка", "promptB": "Katze"},
                {"id": "kotka", "promptA": "котка", "promptB": "Kater"}
            ]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "kotka"));
    }
}
