//! Playbook data model: per-work evolving memory of sections and bullets.
//!
//! A [`Playbook`] always carries the five canonical sections, even when they
//! are empty. Sections are keyed by their canonical string key so that a
//! persisted document with an unknown key still deserializes; the memory
//! crate folds such keys back into canonical sections on load.
//!
//! Deserialization is lenient field by field: a `null` or mistyped value
//! falls back to the field's default, and a malformed bullet or section entry
//! is skipped without taking its siblings with it.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Current persisted schema version.
pub const PLAYBOOK_VERSION: u32 = 1;

/// The five canonical topical buckets, in fixed render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Preferences,
    Project,
    Workflow,
    OpenThreads,
    Misc,
}

impl SectionKey {
    /// All canonical sections in declared order.
    pub const ALL: [SectionKey; 5] = [
        SectionKey::Preferences,
        SectionKey::Project,
        SectionKey::Workflow,
        SectionKey::OpenThreads,
        SectionKey::Misc,
    ];

    /// The storage key (`preferences`, `open_threads`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Preferences => "preferences",
            SectionKey::Project => "project",
            SectionKey::Workflow => "workflow",
            SectionKey::OpenThreads => "open_threads",
            SectionKey::Misc => "misc",
        }
    }

    /// Human-readable section title used in rendered output.
    pub fn default_title(&self) -> &'static str {
        match self {
            SectionKey::Preferences => "Preferences",
            SectionKey::Project => "Project Facts",
            SectionKey::Workflow => "Workflow",
            SectionKey::OpenThreads => "Open Threads",
            SectionKey::Misc => "Misc",
        }
    }

    /// Exact match on the canonical storage key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic memory fact, preference, or note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    /// Unique, never-reused id such as `ace-00001`.
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient")]
    pub content: String,

    #[serde(default, deserialize_with = "lenient")]
    pub hit_count: u64,

    #[serde(default, deserialize_with = "lenient")]
    pub helpful_count: u64,

    #[serde(default, deserialize_with = "lenient")]
    pub harmful_count: u64,

    /// Present only when an embedding provider was available at write time.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Bullet {
    /// Create a fresh bullet with zeroed counters.
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Option<Vec<f32>>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            content: content.into(),
            hit_count: 0,
            helpful_count: 0,
            harmful_count: 0,
            embedding,
            created_at: now,
            updated_at: Some(now),
        }
    }

    /// `updated_at`, falling back to `created_at`.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Refresh `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// A titled, insertion-ordered list of bullets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,

    #[serde(default, deserialize_with = "lenient_bullets")]
    pub bullets: Vec<Bullet>,
}

impl Section {
    pub fn new(key: SectionKey) -> Self {
        Self {
            title: key.default_title().to_string(),
            bullets: Vec::new(),
        }
    }
}

/// The per-work memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
    #[serde(default, deserialize_with = "lenient")]
    pub version: u32,

    #[serde(default, deserialize_with = "lenient")]
    pub work_id: String,

    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,

    /// Next bullet sequence number; carried in the document, never global.
    #[serde(default, deserialize_with = "lenient")]
    pub next_bullet_seq: u64,

    #[serde(default, deserialize_with = "lenient_sections")]
    pub sections: BTreeMap<String, Section>,
}

impl Playbook {
    /// An empty playbook with all canonical sections present.
    pub fn new(work_id: impl Into<String>) -> Self {
        let now = Utc::now();
        let sections = SectionKey::ALL
            .into_iter()
            .map(|key| (key.as_str().to_string(), Section::new(key)))
            .collect();
        Self {
            version: PLAYBOOK_VERSION,
            work_id: work_id.into(),
            created_at: now,
            updated_at: now,
            next_bullet_seq: 1,
            sections,
        }
    }

    pub fn section(&self, key: SectionKey) -> Option<&Section> {
        self.sections.get(key.as_str())
    }

    /// Mutable access, creating the section if a repair pass has not run yet.
    pub fn section_mut(&mut self, key: SectionKey) -> &mut Section {
        self.sections
            .entry(key.as_str().to_string())
            .or_insert_with(|| Section::new(key))
    }

    /// Iterate canonical sections in declared order, skipping absent ones.
    pub fn canonical_sections(&self) -> impl Iterator<Item = (SectionKey, &Section)> {
        SectionKey::ALL
            .into_iter()
            .filter_map(|key| self.section(key).map(|section| (key, section)))
    }

    /// Find a bullet by id across all sections.
    pub fn find_bullet_mut(&mut self, id: &str) -> Option<&mut Bullet> {
        self.sections
            .values_mut()
            .flat_map(|s| s.bullets.iter_mut())
            .find(|b| b.id == id)
    }

    pub fn find_bullet(&self, id: &str) -> Option<&Bullet> {
        self.sections
            .values()
            .flat_map(|s| s.bullets.iter())
            .find(|b| b.id == id)
    }

    /// Total number of bullets across all sections.
    pub fn bullet_count(&self) -> usize {
        self.sections.values().map(|s| s.bullets.len()).sum()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// `null` or a value of the wrong type becomes `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|_| Utc::now()))
}

fn lenient_bullets<'de, D>(deserializer: D) -> Result<Vec<Bullet>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Bullet>(entry) {
            Ok(bullet) => Some(bullet),
            Err(e) => {
                warn!(error = %e, "Skipping malformed bullet");
                None
            }
        })
        .collect())
}

fn lenient_sections<'de, D>(deserializer: D) -> Result<BTreeMap<String, Section>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, entry)| match serde_json::from_value::<Section>(entry) {
            Ok(section) => Some((key, section)),
            Err(e) => {
                warn!(section = %key, error = %e, "Skipping malformed section");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_playbook_has_all_canonical_sections() {
        let pb = Playbook::new("w1");
        assert_eq!(pb.sections.len(), 5);
        for key in SectionKey::ALL {
            let section = pb.section(key).unwrap();
            assert_eq!(section.title, key.default_title());
            assert!(section.bullets.is_empty());
        }
        assert_eq!(pb.next_bullet_seq, 1);
        assert_eq!(pb.version, PLAYBOOK_VERSION);
    }

    #[test]
    fn section_key_roundtrips_through_str() {
        for key in SectionKey::ALL {
            assert_eq!(SectionKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(SectionKey::from_key("Preferences"), None);
    }

    #[test]
    fn bullet_last_touched_falls_back_to_created_at() {
        let mut bullet = Bullet::new("ace-00001", "Always write in formal tone", None);
        bullet.updated_at = None;
        assert_eq!(bullet.last_touched(), bullet.created_at);
    }

    #[test]
    fn bullet_without_embedding_omits_field() {
        let bullet = Bullet::new("ace-00001", "Prefers British spelling", None);
        let json = serde_json::to_string(&bullet).unwrap();
        assert!(!json.contains("embedding"));
        assert!(json.contains("ace-00001"));
    }

    #[test]
    fn sparse_document_deserializes_with_defaults() {
        let json = r#"{"sections":{"preferences":{"bullets":[{"id":"ace-00003","content":"Use Oxford commas always"}]}}}"#;
        let pb: Playbook = serde_json::from_str(json).unwrap();
        assert_eq!(pb.version, 0);
        assert_eq!(pb.next_bullet_seq, 0);
        let bullet = pb.find_bullet("ace-00003").unwrap();
        assert_eq!(bullet.hit_count, 0);
        assert!(bullet.updated_at.is_none());
    }

    #[test]
    fn null_and_mistyped_fields_fall_back_to_defaults() {
        let json = r#"{
            "version": null,
            "work_id": 7,
            "created_at": "last tuesday",
            "next_bullet_seq": null,
            "sections": {
                "preferences": {"title": null, "bullets": [
                    {"id": "ace-00001", "content": "Prefers short paragraphs", "hit_count": 4,
                     "created_at": "not a date", "updated_at": false},
                    "stray string",
                    {"id": "ace-00002", "content": "Uses British spelling", "hit_count": "many",
                     "embedding": [1.0, null]}
                ]},
                "workflow": {"bullets": null},
                "misc": "oops"
            }
        }"#;
        let pb: Playbook = serde_json::from_str(json).unwrap();
        assert_eq!(pb.version, 0);
        assert_eq!(pb.work_id, "");
        assert_eq!(pb.next_bullet_seq, 0);
        assert!(!pb.sections.contains_key("misc"));
        assert!(pb.section(SectionKey::Workflow).unwrap().bullets.is_empty());

        let prefs = pb.section(SectionKey::Preferences).unwrap();
        assert_eq!(prefs.title, "");
        assert_eq!(prefs.bullets.len(), 2);
        assert_eq!(prefs.bullets[0].hit_count, 4);
        assert!(prefs.bullets[0].updated_at.is_none());
        assert_eq!(prefs.bullets[1].hit_count, 0);
        assert!(prefs.bullets[1].embedding.is_none());
    }

    #[test]
    fn find_bullet_mut_spans_sections() {
        let mut pb = Playbook::new("w1");
        pb.section_mut(SectionKey::Workflow)
            .bullets
            .push(Bullet::new("ace-00007", "Draft outlines before chapters", None));
        pb.find_bullet_mut("ace-00007").unwrap().hit_count += 1;
        assert_eq!(pb.find_bullet("ace-00007").unwrap().hit_count, 1);
        assert_eq!(pb.bullet_count(), 1);
    }
}
