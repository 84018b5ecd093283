//! Delta applier: incremental, dedup-aware growth of a playbook.
//!
//! Operations are applied one at a time in input order. A candidate either
//! merges into an existing bullet of its target section (exact match on
//! normalized text, or near-duplicate by embedding) or becomes a new bullet.
//! Existing bullets are never rewritten or removed here.

use crate::classifier::classify;
use crate::embeddings::Embeddings;
use crate::store::allocate_id;
use crate::vector::most_similar;
use quillmind_config::PlaybookConfig;
use quillmind_core::operation::DeltaOperation;
use quillmind_core::playbook::{Bullet, Playbook, SectionKey};
use serde::Serialize;
use tracing::{debug, info};

/// Counts reported back to the reflection process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeltaOutcome {
    pub added: usize,
    pub merged: usize,
}

impl DeltaOutcome {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.merged > 0
    }
}

enum Placement {
    Merged(String),
    Added(String),
}

pub struct DeltaApplier {
    min_content_chars: usize,
    near_duplicate_threshold: f32,
}

impl Default for DeltaApplier {
    fn default() -> Self {
        Self {
            min_content_chars: 8,
            near_duplicate_threshold: 0.92,
        }
    }
}

impl DeltaApplier {
    pub fn new(min_content_chars: usize, near_duplicate_threshold: f32) -> Self {
        Self {
            min_content_chars,
            near_duplicate_threshold,
        }
    }

    pub fn from_config(config: &PlaybookConfig) -> Self {
        Self::new(config.min_content_chars, config.near_duplicate_threshold)
    }

    /// Apply operations to `playbook` in order.
    pub async fn apply(
        &self,
        playbook: &mut Playbook,
        operations: &[DeltaOperation],
        embeddings: &Embeddings,
    ) -> DeltaOutcome {
        let mut outcome = DeltaOutcome::default();

        for op in operations {
            let DeltaOperation::Add { section, content } = op;
            let content = content.trim();
            let visible = content.chars().filter(|c| !c.is_whitespace()).count();
            if visible < self.min_content_chars {
                debug!(chars = visible, "Rejecting short delta content");
                continue;
            }

            let key = classify(section);
            match self.place(playbook, key, content, embeddings).await {
                Placement::Merged(id) => {
                    debug!(bullet_id = %id, section = %key, "Merged delta into existing bullet");
                    outcome.merged += 1;
                }
                Placement::Added(id) => {
                    debug!(bullet_id = %id, section = %key, "Added bullet");
                    outcome.added += 1;
                }
            }
        }

        if outcome.changed() {
            playbook.touch();
            info!(
                work_id = %playbook.work_id,
                added = outcome.added,
                merged = outcome.merged,
                "Applied playbook delta"
            );
        }
        outcome
    }

    async fn place(
        &self,
        playbook: &mut Playbook,
        key: SectionKey,
        content: &str,
        embeddings: &Embeddings,
    ) -> Placement {
        let normalized = normalize_content(content);
        let bullets = &mut playbook.section_mut(key).bullets;

        if let Some(existing) = bullets
            .iter_mut()
            .find(|b| normalize_content(&b.content) == normalized)
        {
            merge_into(existing);
            return Placement::Merged(existing.id.clone());
        }

        let embedding = embeddings.embed(content).await;
        if let Some(vector) = embedding.as_deref() {
            let best = most_similar(vector, bullets.iter().map(|b| b.embedding.as_deref()));
            if let Some((idx, similarity)) = best {
                if similarity >= self.near_duplicate_threshold {
                    let existing = &mut bullets[idx];
                    debug!(bullet_id = %existing.id, similarity, "Near-duplicate delta");
                    merge_into(existing);
                    return Placement::Merged(existing.id.clone());
                }
            }
        }

        let id = allocate_id(playbook);
        playbook
            .section_mut(key)
            .bullets
            .push(Bullet::new(id.clone(), content, embedding));
        Placement::Added(id)
    }
}

fn merge_into(bullet: &mut Bullet) {
    bullet.hit_count += 1;
    bullet.touch();
}

/// Collapse whitespace runs and case-fold.
fn normalize_content(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
