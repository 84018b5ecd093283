//! Bullet store: durable, per-work playbooks on top of a key-value backend.
//!
//! `load` never fails: a missing playbook is created and persisted, a sparse
//! or partly malformed one is repaired in place, and an unreadable backend
//! yields an in-memory empty playbook. Only a document that is not a JSON
//! object at all is quarantined. `save` is best-effort. `save_in_background` detaches the
//! write entirely; handles are tracked only so a host can drain them at
//! shutdown.

use crate::classifier::classify;
use quillmind_core::error::StorageError;
use quillmind_core::playbook::{Playbook, Section, SectionKey, PLAYBOOK_VERSION};
use quillmind_core::storage::PersistenceBackend;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Namespace prefix for playbook keys.
pub const STORAGE_NAMESPACE: &str = "ace_playbook";

/// Prefix of every bullet id.
pub const BULLET_ID_PREFIX: &str = "ace-";

/// Backend key for a work's playbook.
pub fn storage_key(work_id: &str) -> String {
    format!("{STORAGE_NAMESPACE}:{work_id}")
}

/// Format a sequence number as a bullet id (`ace-00001`).
pub fn format_bullet_id(seq: u64) -> String {
    format!("{BULLET_ID_PREFIX}{seq:05}")
}

fn quarantine_key(key: &str) -> String {
    format!("{key}:corrupt")
}

/// Parse a stored document. Anything shaped like an object yields a playbook.
fn parse_document(raw: &str) -> Result<Playbook, StorageError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    if !value.is_object() {
        return Err(StorageError::Serialization(
            "playbook document is not a JSON object".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn parse_bullet_seq(id: &str) -> Option<u64> {
    id.strip_prefix(BULLET_ID_PREFIX)?.parse().ok()
}

/// Allocate the next bullet id from the playbook's own counter.
pub fn allocate_id(playbook: &mut Playbook) -> String {
    if playbook.next_bullet_seq == 0 {
        playbook.next_bullet_seq = 1;
    }
    let id = format_bullet_id(playbook.next_bullet_seq);
    playbook.next_bullet_seq += 1;
    id
}

/// Bring a deserialized playbook back to a valid shape without dropping bullets.
///
/// Returns `true` if anything changed.
pub fn repair(playbook: &mut Playbook, work_id: &str) -> bool {
    let mut changed = false;

    if playbook.version == 0 {
        playbook.version = PLAYBOOK_VERSION;
        changed = true;
    }

    if playbook.work_id != work_id {
        if !playbook.work_id.is_empty() {
            warn!(stored = %playbook.work_id, work_id = %work_id, "Playbook work id mismatch, rewriting");
        }
        playbook.work_id = work_id.to_string();
        changed = true;
    }

    // Fold non-canonical section keys into their canonical bucket.
    let stray: Vec<String> = playbook
        .sections
        .keys()
        .filter(|k| SectionKey::from_key(k).is_none())
        .cloned()
        .collect();
    for key in stray {
        if let Some(section) = playbook.sections.remove(&key) {
            let target = classify(&key);
            debug!(from = %key, to = %target, bullets = section.bullets.len(), "Folding stray section");
            playbook.section_mut(target).bullets.extend(section.bullets);
            changed = true;
        }
    }

    for key in SectionKey::ALL {
        let section = playbook
            .sections
            .entry(key.as_str().to_string())
            .or_insert_with(|| {
                changed = true;
                Section::new(key)
            });
        if section.title.trim().is_empty() {
            section.title = key.default_title().to_string();
            changed = true;
        }
    }

    // The counter must stay ahead of every id already handed out.
    let max_seen = playbook
        .sections
        .values()
        .flat_map(|s| s.bullets.iter())
        .filter_map(|b| parse_bullet_seq(&b.id))
        .max()
        .unwrap_or(0);
    let floor = max_seen.saturating_add(1).max(1);
    if playbook.next_bullet_seq < floor {
        playbook.next_bullet_seq = floor;
        changed = true;
    }

    // Missing or duplicated ids get fresh ones.
    let mut seen = HashSet::new();
    let mut needs_id = Vec::new();
    for key in SectionKey::ALL {
        if let Some(section) = playbook.section(key) {
            for (idx, bullet) in section.bullets.iter().enumerate() {
                if bullet.id.trim().is_empty() || !seen.insert(bullet.id.clone()) {
                    needs_id.push((key, idx));
                }
            }
        }
    }
    for (key, idx) in needs_id {
        let id = allocate_id(playbook);
        playbook.section_mut(key).bullets[idx].id = id;
        changed = true;
    }

    changed
}

/// Durable playbook storage for many works.
#[derive(Clone)]
pub struct BulletStore {
    backend: Arc<dyn PersistenceBackend>,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl BulletStore {
    pub fn new(backend: Arc<dyn PersistenceBackend>) -> Self {
        Self {
            backend,
            pending: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Load a work's playbook, creating and persisting an empty one if absent.
    pub async fn load(&self, work_id: &str) -> Playbook {
        // Read-your-writes for saves issued from this process.
        self.flush_pending().await;

        let key = storage_key(work_id);
        match self.backend.get(&key).await {
            Ok(Some(raw)) => match parse_document(&raw) {
                Ok(mut playbook) => {
                    if repair(&mut playbook, work_id) {
                        info!(work_id = %work_id, "Repaired stored playbook");
                    }
                    playbook
                }
                Err(e) => {
                    error!(work_id = %work_id, error = %e, "Stored playbook is unreadable");
                    let playbook = Playbook::new(work_id);
                    if self.quarantine(&key, raw).await {
                        self.save(work_id, &playbook).await;
                    }
                    playbook
                }
            },
            Ok(None) => {
                debug!(work_id = %work_id, "Creating empty playbook");
                let playbook = Playbook::new(work_id);
                self.save(work_id, &playbook).await;
                playbook
            }
            Err(e) => {
                warn!(work_id = %work_id, error = %e, "Playbook load failed, using in-memory copy");
                Playbook::new(work_id)
            }
        }
    }

    /// Persist a playbook, returning the backend result.
    pub async fn try_save(&self, work_id: &str, playbook: &Playbook) -> Result<(), StorageError> {
        let json = serde_json::to_string(playbook)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(&storage_key(work_id), json).await
    }

    /// Best-effort save. Failures are logged; returns whether the write landed.
    pub async fn save(&self, work_id: &str, playbook: &Playbook) -> bool {
        match self.try_save(work_id, playbook).await {
            Ok(()) => {
                debug!(work_id = %work_id, bullets = playbook.bullet_count(), "Playbook saved");
                true
            }
            Err(e) => {
                warn!(work_id = %work_id, error = %e, "Playbook save failed, keeping in-memory copy");
                false
            }
        }
    }

    /// Fire-and-forget save on the current tokio runtime.
    pub fn save_in_background(&self, work_id: &str, playbook: Playbook) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(work_id = %work_id, "No async runtime, skipping background save");
            return;
        }

        let store = self.clone();
        let work_id = work_id.to_string();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            store.save(&work_id, &playbook).await;
        });
    }

    /// Wait for all background saves issued so far.
    pub async fn flush_pending(&self) {
        let mut set = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending)
        };
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Background save task failed");
            }
        }
    }

    /// Replace the stored playbook with an empty one and drop any quarantined copy.
    pub async fn reset(&self, work_id: &str) -> Playbook {
        self.flush_pending().await;
        let playbook = Playbook::new(work_id);
        self.save(work_id, &playbook).await;

        let backup = quarantine_key(&storage_key(work_id));
        match self.backend.remove(&backup).await {
            Ok(true) => debug!(key = %backup, "Removed quarantined playbook"),
            Ok(false) => {}
            Err(e) => warn!(key = %backup, error = %e, "Could not remove quarantined playbook"),
        }

        info!(work_id = %work_id, "Playbook reset");
        playbook
    }

    /// Copy an unreadable document aside so a fresh save cannot destroy it.
    async fn quarantine(&self, key: &str, raw: String) -> bool {
        let backup = quarantine_key(key);
        match self.backend.set(&backup, raw).await {
            Ok(()) => {
                warn!(key = %backup, "Quarantined unreadable playbook");
                true
            }
            Err(e) => {
                error!(key = %backup, error = %e, "Could not quarantine unreadable playbook");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryBackend;
    use crate::test_helpers::FailingBackend;
    use quillmind_core::playbook::Bullet;

    fn store() -> (BulletStore, InMemoryBackend) {
        let kv = InMemoryBackend::new();
        (BulletStore::new(Arc::new(kv.clone())), kv)
    }

    #[test]
    fn storage_key_uses_namespace() {
        assert_eq!(storage_key("w1"), "ace_playbook:w1");
    }

    #[test]
    fn allocate_id_is_monotonic_and_padded() {
        let mut pb = Playbook::new("w1");
        assert_eq!(allocate_id(&mut pb), "ace-00001");
        assert_eq!(allocate_id(&mut pb), "ace-00002");
        assert_eq!(pb.next_bullet_seq, 3);
    }

    #[test]
    fn allocate_id_recovers_from_zero_counter() {
        let mut pb = Playbook::new("w1");
        pb.next_bullet_seq = 0;
        assert_eq!(allocate_id(&mut pb), "ace-00001");
    }

    #[tokio::test]
    async fn load_creates_and_persists_empty_playbook() {
        let (store, kv) = store();
        let pb = store.load("w1").await;
        assert_eq!(pb.work_id, "w1");
        assert_eq!(pb.sections.len(), 5);
        assert!(kv.get("ace_playbook:w1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips_content() {
        let (store, _kv) = store();
        let mut pb = store.load("w1").await;
        let id = allocate_id(&mut pb);
        let mut bullet = Bullet::new(id, "Always write in formal tone", Some(vec![0.5, 0.5]));
        bullet.hit_count = 3;
        bullet.helpful_count = 1;
        pb.section_mut(SectionKey::Preferences).bullets.push(bullet);
        assert!(store.save("w1", &pb).await);

        let loaded = store.load("w1").await;
        assert_eq!(loaded.sections, pb.sections);
        assert_eq!(loaded.next_bullet_seq, pb.next_bullet_seq);
    }

    #[tokio::test]
    async fn load_repairs_sparse_document_without_losing_bullets() {
        let (store, kv) = store();
        kv.set(
            "ace_playbook:w1",
            r#"{"sections":{
                "Preferences":{"bullets":[{"id":"ace-00004","content":"Prefers short paragraphs"}]},
                "project":{"title":"","bullets":[{"content":"Novel is set in 1920s Lisbon"}]}
            }}"#
            .into(),
        )
        .await
        .unwrap();

        let pb = store.load("w1").await;
        assert_eq!(pb.version, PLAYBOOK_VERSION);
        assert_eq!(pb.work_id, "w1");
        assert_eq!(pb.sections.len(), 5);
        assert!(pb.sections.contains_key("preferences"));
        assert!(!pb.sections.contains_key("Preferences"));
        assert_eq!(pb.section(SectionKey::Project).unwrap().title, "Project Facts");

        let prefs = &pb.section(SectionKey::Preferences).unwrap().bullets;
        assert_eq!(prefs[0].id, "ace-00004");

        // The id-less bullet got an id above the highest existing one.
        let project = &pb.section(SectionKey::Project).unwrap().bullets;
        assert_eq!(project[0].id, "ace-00005");
        assert_eq!(pb.next_bullet_seq, 6);
    }

    #[test]
    fn repair_reassigns_duplicate_ids() {
        let mut pb = Playbook::new("w1");
        pb.next_bullet_seq = 2;
        pb.section_mut(SectionKey::Misc)
            .bullets
            .push(Bullet::new("ace-00001", "First note about the draft", None));
        pb.section_mut(SectionKey::Misc)
            .bullets
            .push(Bullet::new("ace-00001", "Second note about the draft", None));
        assert!(repair(&mut pb, "w1"));
        let ids: Vec<_> = pb.section(SectionKey::Misc).unwrap().bullets.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids, vec!["ace-00001", "ace-00002"]);
    }

    #[test]
    fn repair_is_noop_on_valid_playbook() {
        let mut pb = Playbook::new("w1");
        assert!(!repair(&mut pb, "w1"));
    }

    #[tokio::test]
    async fn unreadable_document_is_quarantined() {
        let (store, kv) = store();
        kv.set("ace_playbook:w1", "not json at all".into()).await.unwrap();

        let pb = store.load("w1").await;
        assert_eq!(pb.bullet_count(), 0);
        assert_eq!(
            kv.get("ace_playbook:w1:corrupt").await.unwrap().as_deref(),
            Some("not json at all")
        );
    }

    #[tokio::test]
    async fn non_object_document_is_quarantined() {
        let (store, kv) = store();
        kv.set("ace_playbook:w1", "[1, 2, 3]".into()).await.unwrap();

        assert_eq!(store.load("w1").await.bullet_count(), 0);
        assert_eq!(
            kv.get("ace_playbook:w1:corrupt").await.unwrap().as_deref(),
            Some("[1, 2, 3]")
        );
    }

    #[tokio::test]
    async fn null_counter_is_repaired_without_losing_bullets() {
        let (store, kv) = store();
        kv.set(
            "ace_playbook:w1",
            r#"{"version":1,"work_id":"w1","next_bullet_seq":null,"sections":{
                "preferences":{"title":"Preferences","bullets":[
                    {"id":"ace-00001","content":"Prefers short paragraphs","hit_count":4}
                ]}
            }}"#
            .into(),
        )
        .await
        .unwrap();

        let pb = store.load("w1").await;
        assert_eq!(pb.bullet_count(), 1);
        let bullet = pb.find_bullet("ace-00001").unwrap();
        assert_eq!(bullet.content, "Prefers short paragraphs");
        assert_eq!(bullet.hit_count, 4);
        assert_eq!(pb.next_bullet_seq, 2);
        assert!(kv.get("ace_playbook:w1:corrupt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_fields_keep_sibling_bullets() {
        let (store, kv) = store();
        kv.set(
            "ace_playbook:w1",
            r#"{"version":null,"work_id":null,"updated_at":"soon","sections":{
                "preferences":{"title":null,"bullets":[
                    {"id":"ace-00002","content":"Prefers short paragraphs","created_at":"not a date"},
                    42,
                    {"id":"ace-00003","content":"Uses British spelling","helpful_count":-1}
                ]},
                "workflow":"not a section"
            }}"#
            .into(),
        )
        .await
        .unwrap();

        let pb = store.load("w1").await;
        assert_eq!(pb.version, PLAYBOOK_VERSION);
        assert_eq!(pb.work_id, "w1");
        assert_eq!(pb.sections.len(), 5);

        let prefs = pb.section(SectionKey::Preferences).unwrap();
        assert_eq!(prefs.title, "Preferences");
        let ids: Vec<_> = prefs.bullets.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["ace-00002", "ace-00003"]);
        assert_eq!(prefs.bullets[1].helpful_count, 0);
        assert_eq!(pb.next_bullet_seq, 4);
        assert!(kv.get("ace_playbook:w1:corrupt").await.unwrap().is_none());

        // The repaired document is what a later save writes back.
        assert!(store.save("w1", &pb).await);
        assert_eq!(store.load("w1").await.bullet_count(), 2);
    }

    #[tokio::test]
    async fn backend_failures_are_not_fatal() {
        let store = BulletStore::new(Arc::new(FailingBackend));
        let pb = store.load("w1").await;
        assert_eq!(pb.work_id, "w1");
        assert!(!store.save("w1", &pb).await);
        assert!(store.try_save("w1", &pb).await.is_err());
    }

    #[tokio::test]
    async fn background_save_lands_after_flush() {
        let (store, kv) = store();
        let mut pb = Playbook::new("w2");
        let id = allocate_id(&mut pb);
        pb.section_mut(SectionKey::Workflow)
            .bullets
            .push(Bullet::new(id, "Draft the outline before prose", None));

        store.save_in_background("w2", pb);
        store.flush_pending().await;

        let raw = kv.get("ace_playbook:w2").await.unwrap().unwrap();
        assert!(raw.contains("Draft the outline before prose"));
    }

    #[tokio::test]
    async fn reset_empties_playbook() {
        let (store, _kv) = store();
        let mut pb = store.load("w1").await;
        let id = allocate_id(&mut pb);
        pb.section_mut(SectionKey::Misc)
            .bullets
            .push(Bullet::new(id, "Remember to cite sources", None));
        store.save("w1", &pb).await;

        let fresh = store.reset("w1").await;
        assert_eq!(fresh.bullet_count(), 0);
        assert_eq!(store.load("w1").await.bullet_count(), 0);
    }

    #[tokio::test]
    async fn reset_drops_quarantined_copy() {
        let (store, kv) = store();
        kv.set("ace_playbook:w1", "{ truncated".into()).await.unwrap();
        store.load("w1").await;
        assert!(kv.get("ace_playbook:w1:corrupt").await.unwrap().is_some());

        store.reset("w1").await;
        assert!(kv.get("ace_playbook:w1:corrupt").await.unwrap().is_none());
        assert!(kv.get("ace_playbook:w1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_survives_failing_backend() {
        let store = BulletStore::new(Arc::new(FailingBackend));
        assert_eq!(store.reset("w1").await.work_id, "w1");
    }
}
