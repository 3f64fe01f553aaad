//! Values that flow between stages.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};

/// One unit of data moving through the pipeline.
///
/// Items are never mutated; stages read their text form and emit new items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
    /// An integer, rendered in decimal
    Int(i64),
    /// Text, used as-is
    Text(String),
    /// Raw bytes, which must be UTF-8 to be hashed
    Bytes(Vec<u8>),
}

impl Item {
    /// The textual form stages hash.
    pub fn as_text(&self) -> Result<String, ItemError> {
        match self {
            Item::Int(value) => Ok(value.to_string()),
            Item::Text(text) => Ok(text.clone()),
            Item::Bytes(bytes) => String::from_utf8(bytes.clone()).map_err(|e| {
                ItemError::NotText {
                    reason: e.to_string(),
                }
            }),
        }
    }

    /// Consume the item, returning its text without cloning when possible.
    pub fn into_text(self) -> Result<String, ItemError> {
        match self {
            Item::Int(value) => Ok(value.to_string()),
            Item::Text(text) => Ok(text),
            Item::Bytes(bytes) => String::from_utf8(bytes).map_err(|e| ItemError::NotText {
                reason: e.to_string(),
            }),
        }
    }
}

impl From<i64> for Item {
    fn from(value: i64) -> Self {
        Item::Int(value)
    }
}

impl From<String> for Item {
    fn from(value: String) -> Self {
        Item::Text(value)
    }
}

impl From<&str> for Item {
    fn from(value: &str) -> Self {
        Item::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Item {
    fn from(value: Vec<u8>) -> Self {
        Item::Bytes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_render_in_decimal() {
        assert_eq!(Item::from(-17).as_text().unwrap(), "-17");
        assert_eq!(Item::from(0).into_text().unwrap(), "0");
    }

    #[test]
    fn utf8_bytes_are_text() {
        let item = Item::from(b"signer".to_vec());
        assert_eq!(item.as_text().unwrap(), "signer");
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let item = Item::from(vec![0xff, 0xfe, 0x00]);
        assert!(matches!(item.as_text(), Err(ItemError::NotText { .. })));
        assert!(item.into_text().is_err());
    }

    #[test]
    fn json_numbers_and_strings_map_to_variants() {
        let items: Vec<Item> = serde_json::from_str(r#"[1, "two"]"#).unwrap();
        assert_eq!(items, vec![Item::Int(1), Item::Text("two".to_string())]);
    }
}
