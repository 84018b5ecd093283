//! Playbook service: the per-work control flow in one place.
//!
//! Recall: load, select, render the injection view, count hits for exactly
//! the bullets that made it into the text, save in the background.
//! Apply and feedback: load, mutate, save in the background.

use crate::delta::{DeltaApplier, DeltaOutcome};
use crate::embeddings::Embeddings;
use crate::render::{Rendered, render_curator_view, render_injection_view};
use crate::retriever::{Retriever, SelectedBullet};
use crate::store::BulletStore;
use crate::usage::UsageTracker;
use quillmind_config::PlaybookConfig;
use quillmind_core::operation::{BulletFeedback, DeltaOperation};
use quillmind_core::playbook::{Playbook, SectionKey};
use serde::Serialize;
use tracing::info;

/// Text to splice into a prompt, with the bullets it shows.
#[derive(Debug, Clone, Serialize)]
pub struct Injection {
    pub text: String,
    pub bullets: Vec<SelectedBullet>,
    pub tokens_used: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionStats {
    pub key: SectionKey,
    pub title: String,
    pub bullets: usize,
    pub hits: u64,
    pub helpful: u64,
    pub harmful: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybookStats {
    pub work_id: String,
    pub total_bullets: usize,
    pub next_bullet_seq: u64,
    pub sections: Vec<SectionStats>,
}

impl PlaybookStats {
    pub fn from_playbook(playbook: &Playbook) -> Self {
        let sections = playbook
            .canonical_sections()
            .map(|(key, section)| SectionStats {
                key,
                title: section.title.clone(),
                bullets: section.bullets.len(),
                hits: section.bullets.iter().map(|b| b.hit_count).sum(),
                helpful: section.bullets.iter().map(|b| b.helpful_count).sum(),
                harmful: section.bullets.iter().map(|b| b.harmful_count).sum(),
            })
            .collect();
        Self {
            work_id: playbook.work_id.clone(),
            total_bullets: playbook.bullet_count(),
            next_bullet_seq: playbook.next_bullet_seq,
            sections,
        }
    }
}

pub struct PlaybookService {
    store: BulletStore,
    embeddings: Embeddings,
    applier: DeltaApplier,
    retriever: Retriever,
    tracker: UsageTracker,
    top_k: usize,
    injection_budget: usize,
    curator_budget: usize,
}

impl PlaybookService {
    pub fn new(store: BulletStore, embeddings: Embeddings, config: &PlaybookConfig) -> Self {
        Self {
            tracker: UsageTracker::new(store.clone()),
            store,
            embeddings,
            applier: DeltaApplier::from_config(config),
            retriever: Retriever::from_config(config),
            top_k: config.top_k,
            injection_budget: config.injection_token_budget,
            curator_budget: config.curator_token_budget,
        }
    }

    pub fn store(&self) -> &BulletStore {
        &self.store
    }

    pub fn embeddings(&self) -> &Embeddings {
        &self.embeddings
    }

    pub async fn load(&self, work_id: &str) -> Playbook {
        self.store.load(work_id).await
    }

    /// Apply reflection output to a work's playbook.
    pub async fn apply(&self, work_id: &str, operations: &[DeltaOperation]) -> DeltaOutcome {
        let mut playbook = self.store.load(work_id).await;
        let outcome = self
            .applier
            .apply(&mut playbook, operations, &self.embeddings)
            .await;
        if outcome.changed() {
            self.store.save_in_background(work_id, playbook);
        }
        outcome
    }

    /// Select and render relevant bullets for a prompt.
    pub async fn recall(
        &self,
        work_id: &str,
        query: &str,
        top_k: Option<usize>,
        budget: Option<usize>,
    ) -> Injection {
        let mut playbook = self.store.load(work_id).await;
        let selection = self
            .retriever
            .select(&playbook, query, &self.embeddings, top_k.unwrap_or(self.top_k))
            .await;
        let rendered = render_injection_view(&selection, budget.unwrap_or(self.injection_budget));

        let shown: Vec<SelectedBullet> = selection
            .into_iter()
            .filter(|s| rendered.bullet_ids.contains(&s.bullet.id))
            .collect();
        self.tracker
            .record_selection(&mut playbook, rendered.bullet_ids.iter().map(String::as_str));

        info!(
            work_id = %work_id,
            shown = shown.len(),
            tokens = rendered.tokens_used,
            "Recalled playbook bullets"
        );
        Injection {
            text: rendered.text,
            bullets: shown,
            tokens_used: rendered.tokens_used,
        }
    }

    /// Apply feedback tags; returns how many bullets changed.
    pub async fn feedback(&self, work_id: &str, feedback: &[BulletFeedback]) -> usize {
        let mut playbook = self.store.load(work_id).await;
        self.tracker.record_feedback(&mut playbook, feedback)
    }

    /// Whole playbook with counters. Does not count as a hit.
    pub async fn curator_view(&self, work_id: &str, budget: Option<usize>) -> Rendered {
        let playbook = self.store.load(work_id).await;
        render_curator_view(&playbook, budget.unwrap_or(self.curator_budget))
    }

    pub async fn reset(&self, work_id: &str) -> Playbook {
        self.store.reset(work_id).await
    }

    pub async fn stats(&self, work_id: &str) -> PlaybookStats {
        PlaybookStats::from_playbook(&self.store.load(work_id).await)
    }

    /// Wait for outstanding background saves.
    pub async fn flush(&self) {
        self.store.flush_pending().await;
    }
}
