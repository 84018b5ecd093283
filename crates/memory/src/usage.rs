//! Usage tracker: hit and feedback counters.
//!
//! Counter updates happen on the caller's in-memory playbook right away; the
//! save that follows is detached and never reported back.

use crate::store::BulletStore;
use quillmind_core::operation::{BulletFeedback, FeedbackTag};
use quillmind_core::playbook::Playbook;
use tracing::debug;

/// Count one hit for every listed bullet. Returns how many were found.
pub fn record_hits<'a>(playbook: &mut Playbook, ids: impl IntoIterator<Item = &'a str>) -> usize {
    let mut updated = 0;
    for id in ids {
        match playbook.find_bullet_mut(id) {
            Some(bullet) => {
                bullet.hit_count += 1;
                bullet.touch();
                updated += 1;
            }
            None => debug!(bullet_id = %id, "Hit for unknown bullet ignored"),
        }
    }
    if updated > 0 {
        playbook.touch();
    }
    updated
}

/// Apply helpful/harmful tags. Neutral tags and unknown ids are no-ops.
pub fn apply_feedback(playbook: &mut Playbook, feedback: &[BulletFeedback]) -> usize {
    let mut updated = 0;
    for entry in feedback {
        if entry.tag == FeedbackTag::Neutral {
            continue;
        }
        let Some(bullet) = playbook.find_bullet_mut(&entry.id) else {
            debug!(bullet_id = %entry.id, "Feedback for unknown bullet ignored");
            continue;
        };
        match entry.tag {
            FeedbackTag::Helpful => bullet.helpful_count += 1,
            FeedbackTag::Harmful => bullet.harmful_count += 1,
            FeedbackTag::Neutral => {}
        }
        bullet.touch();
        updated += 1;
    }
    if updated > 0 {
        playbook.touch();
    }
    updated
}

/// Counter updates followed by a fire-and-forget save.
#[derive(Clone)]
pub struct UsageTracker {
    store: BulletStore,
}

impl UsageTracker {
    pub fn new(store: BulletStore) -> Self {
        Self { store }
    }

    /// Record that `ids` were injected into a prompt.
    pub fn record_selection<'a>(
        &self,
        playbook: &mut Playbook,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let updated = record_hits(playbook, ids);
        if updated > 0 {
            self.store.save_in_background(&playbook.work_id, playbook.clone());
        }
        updated
    }

    /// Record feedback tags reported for previously shown bullets.
    pub fn record_feedback(&self, playbook: &mut Playbook, feedback: &[BulletFeedback]) -> usize {
        let updated = apply_feedback(playbook, feedback);
        if updated > 0 {
            self.store.save_in_background(&playbook.work_id, playbook.clone());
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryBackend;
    use crate::test_helpers::FailingBackend;
    use quillmind_core::playbook::{Bullet, SectionKey};
    use quillmind_core::storage::PersistenceBackend;
    use std::sync::Arc;

    fn playbook() -> Playbook {
        let mut pb = Playbook::new("w1");
        pb.section_mut(SectionKey::Preferences)
            .bullets
            .push(Bullet::new("ace-00001", "Always write in formal tone", None));
        pb.section_mut(SectionKey::Project)
            .bullets
            .push(Bullet::new("ace-00002", "Story is set in Lisbon", None));
        pb
    }

    fn fb(id: &str, tag: FeedbackTag) -> BulletFeedback {
        BulletFeedback { id: id.into(), tag }
    }

    #[test]
    fn hits_increment_and_touch() {
        let mut pb = playbook();
        let before = pb.find_bullet("ace-00001").unwrap().last_touched();
        assert_eq!(record_hits(&mut pb, ["ace-00001", "ace-00404"]), 1);
        let bullet = pb.find_bullet("ace-00001").unwrap();
        assert_eq!(bullet.hit_count, 1);
        assert!(bullet.last_touched() >= before);
        assert_eq!(pb.find_bullet("ace-00002").unwrap().hit_count, 0);
    }

    #[test]
    fn feedback_updates_matching_counters() {
        let mut pb = playbook();
        let updated = apply_feedback(
            &mut pb,
            &[
                fb("ace-00001", FeedbackTag::Helpful),
                fb("ace-00001", FeedbackTag::Helpful),
                fb("ace-00002", FeedbackTag::Harmful),
                fb("ace-00002", FeedbackTag::Neutral),
                fb("ace-09999", FeedbackTag::Helpful),
            ],
        );
        assert_eq!(updated, 3);
        let first = pb.find_bullet("ace-00001").unwrap();
        assert_eq!((first.helpful_count, first.harmful_count), (2, 0));
        let second = pb.find_bullet("ace-00002").unwrap();
        assert_eq!((second.helpful_count, second.harmful_count), (0, 1));
        assert_eq!(second.hit_count, 0);
    }

    #[test]
    fn neutral_only_feedback_leaves_playbook_untouched() {
        let mut pb = playbook();
        let before = pb.clone();
        assert_eq!(apply_feedback(&mut pb, &[fb("ace-00001", FeedbackTag::Neutral)]), 0);
        assert_eq!(pb, before);
    }

    #[tokio::test]
    async fn selection_is_persisted_in_background() {
        let kv = InMemoryBackend::new();
        let store = BulletStore::new(Arc::new(kv.clone()));
        let tracker = UsageTracker::new(store.clone());

        let mut pb = playbook();
        assert_eq!(tracker.record_selection(&mut pb, ["ace-00002"]), 1);
        assert_eq!(pb.find_bullet("ace-00002").unwrap().hit_count, 1);

        store.flush_pending().await;
        let raw = kv.get("ace_playbook:w1").await.unwrap().unwrap();
        let saved: Playbook = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.find_bullet("ace-00002").unwrap().hit_count, 1);
    }

    #[tokio::test]
    async fn failed_background_save_is_swallowed() {
        let store = BulletStore::new(Arc::new(FailingBackend));
        let tracker = UsageTracker::new(store.clone());

        let mut pb = playbook();
        assert_eq!(
            tracker.record_feedback(&mut pb, &[fb("ace-00001", FeedbackTag::Harmful)]),
            1
        );
        store.flush_pending().await;
        assert_eq!(pb.find_bullet("ace-00001").unwrap().harmful_count, 1);
    }
}
