//! Operations and feedback supplied by the upstream reflection process.
//!
//! Payloads arrive as untyped JSON. They are validated once, here, into a
//! closed set of variants; anything non-conforming is dropped and logged at
//! `debug` so downstream code never re-checks shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A recognized delta operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeltaOperation {
    /// Incorporate a candidate fact into the named section.
    #[serde(rename = "ADD")]
    Add {
        /// Free-form section label, resolved by the section classifier.
        #[serde(default)]
        section: String,
        content: String,
    },
}

impl DeltaOperation {
    pub fn add(section: impl Into<String>, content: impl Into<String>) -> Self {
        DeltaOperation::Add {
            section: section.into(),
            content: content.into(),
        }
    }
}

/// Feedback tag reported for a bullet that was shown in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTag {
    Helpful,
    Harmful,
    Neutral,
}

/// `{id, tag}` entry referencing an existing bullet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletFeedback {
    pub id: String,
    pub tag: FeedbackTag,
}

/// Parse reflection output into delta operations.
///
/// Accepts either a bare array or an object carrying an `operations` array.
/// Entries with an unknown `type` or missing `content` are skipped.
pub fn parse_operations(value: &Value) -> Vec<DeltaOperation> {
    let entries = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("operations") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<DeltaOperation>(entry.clone()) {
            Ok(op) => Some(op),
            Err(e) => {
                debug!(error = %e, "Skipping non-conforming delta operation");
                None
            }
        })
        .collect()
}

/// Parse bullet feedback tags.
///
/// Accepts a bare array or an object carrying `bullet_tags` or `feedback`.
/// Tags are matched case-insensitively; unknown tags are skipped.
pub fn parse_feedback(value: &Value) -> Vec<BulletFeedback> {
    let entries = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("bullet_tags").or_else(|| map.get("feedback")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id")?.as_str()?.trim();
            let tag = entry.get("tag")?.as_str()?.trim().to_lowercase();
            let tag = match tag.as_str() {
                "helpful" => FeedbackTag::Helpful,
                "harmful" => FeedbackTag::Harmful,
                "neutral" => FeedbackTag::Neutral,
                other => {
                    debug!(tag = %other, "Skipping unknown feedback tag");
                    return None;
                }
            };
            if id.is_empty() {
                return None;
            }
            Some(BulletFeedback {
                id: id.to_string(),
                tag,
            })
        })
        .collect()
}
