use anyhow::Result;
use serde_json::Value;

use crate::model::{Node, RawMetadata};
use crate::store::traits::MetadataExtractor;

/// Header names understood by [`HeaderMetadataExtractor`] and the properties they map to
const HEADER_MAPPING: [(&str, &str); 5] = [
    ("title", "cm:title"),
    ("author", "cm:author"),
    ("description", "cm:description"),
    ("subject", "cm:description"),
    ("keywords", "cm:taggable"),
];

/// Reads `Key: Value` header lines at the top of text content.
///
/// Headers end at the first blank line or the first line that is not a
/// header. Keys that already carry a namespace (`cm:title`,
/// `sys:overwritePolicy`) pass through unchanged; other keys are mapped through
/// a fixed table and dropped when unknown.
#[derive(Debug, Clone, Default)]
pub struct HeaderMetadataExtractor;

impl HeaderMetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(content: &str) -> RawMetadata {
        let mut metadata = RawMetadata::new();

        for line in content.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once(": ") else {
                break;
            };
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                break;
            }

            let property = if key.contains(':') {
                Some(key.to_string())
            } else {
                let lower = key.to_ascii_lowercase();
                HEADER_MAPPING
                    .iter()
                    .find(|(header, _)| *header == lower)
                    .map(|(_, property)| property.to_string())
            };

            if let Some(property) = property {
                // First occurrence wins, as with subject/description
                metadata
                    .entry(property)
                    .or_insert_with(|| Value::String(value.trim().to_string()));
            }
        }

        metadata
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for HeaderMetadataExtractor {
    async fn extract(&self, node: &Node) -> Result<Option<RawMetadata>> {
        let Some(content) = node.content.as_deref() else {
            return Ok(None);
        };
        let metadata = Self::parse(content);
        Ok((!metadata.is_empty()).then_some(metadata))
    }
}
