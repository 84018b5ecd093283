//! Retriever: ranks playbook bullets against a query.
//!
//! Pure selection: nothing here mutates the playbook. Three regimes:
//!
//! - empty query: most recently touched first
//! - embedding available: cosine similarity, strictly above a floor
//! - otherwise: lexical substring hits over a capped set of query tokens
//!
//! All sorts are stable so ties keep section order then list order.

use crate::embeddings::Embeddings;
use crate::vector::cosine_similarity;
use quillmind_config::PlaybookConfig;
use quillmind_core::playbook::{Bullet, Playbook, SectionKey};
use serde::Serialize;
use tracing::debug;

/// A bullet chosen for injection, with the section it came from.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedBullet {
    pub section: SectionKey,
    pub section_title: String,
    pub bullet: Bullet,
    /// Similarity, lexical hit count, or 0 for recency ordering.
    pub score: f32,
}

pub struct Retriever {
    min_similarity: f32,
    max_query_tokens: usize,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            min_similarity: 0.25,
            max_query_tokens: 8,
        }
    }
}

impl Retriever {
    pub fn new(min_similarity: f32, max_query_tokens: usize) -> Self {
        Self {
            min_similarity,
            max_query_tokens,
        }
    }

    pub fn from_config(config: &PlaybookConfig) -> Self {
        Self::new(config.min_similarity, config.max_query_tokens)
    }

    /// Rank bullets for `query` and return at most `top_k`.
    pub async fn select(
        &self,
        playbook: &Playbook,
        query: &str,
        embeddings: &Embeddings,
        top_k: usize,
    ) -> Vec<SelectedBullet> {
        let candidates = flatten(playbook);
        let query = query.trim();

        let mut ranked = if query.is_empty() {
            let mut all: Vec<_> = candidates.into_iter().map(|(key, title, b)| (key, title, b, 0.0)).collect();
            all.sort_by(|a, b| b.2.last_touched().cmp(&a.2.last_touched()));
            all
        } else if let Some(query_vec) = embeddings.embed(query).await {
            self.rank_by_similarity(candidates, &query_vec)
        } else {
            self.rank_lexically(candidates, query)
        };

        ranked.truncate(top_k);
        debug!(work_id = %playbook.work_id, selected = ranked.len(), "Retrieved bullets");

        ranked
            .into_iter()
            .map(|(section, section_title, bullet, score)| SelectedBullet {
                section,
                section_title: section_title.to_string(),
                bullet: bullet.clone(),
                score,
            })
            .collect()
    }

    fn rank_by_similarity<'a>(
        &self,
        candidates: Vec<Candidate<'a>>,
        query_vec: &[f32],
    ) -> Vec<Scored<'a>> {
        let mut scored: Vec<_> = candidates
            .into_iter()
            .filter_map(|(key, title, bullet)| {
                let vector = bullet.embedding.as_deref()?;
                let score = cosine_similarity(query_vec, vector);
                (score > self.min_similarity).then_some((key, title, bullet, score))
            })
            .collect();
        scored.sort_by(|a, b| b.3.total_cmp(&a.3));
        scored
    }

    fn rank_lexically<'a>(&self, candidates: Vec<Candidate<'a>>, query: &str) -> Vec<Scored<'a>> {
        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split_whitespace()
            .take(self.max_query_tokens)
            .filter(|t| t.chars().count() >= 2)
            .collect();

        let mut scored: Vec<_> = candidates
            .into_iter()
            .filter_map(|(key, title, bullet)| {
                let content = bullet.content.to_lowercase();
                let hits = tokens.iter().filter(|t| content.contains(**t)).count();
                (hits > 0).then_some((key, title, bullet, hits as f32))
            })
            .collect();
        scored.sort_by(|a, b| b.3.total_cmp(&a.3));
        scored
    }
}

type Candidate<'a> = (SectionKey, &'a str, &'a Bullet);
type Scored<'a> = (SectionKey, &'a str, &'a Bullet, f32);

/// Canonical section order, then list order.
fn flatten(playbook: &Playbook) -> Vec<Candidate<'_>> {
    playbook
        .canonical_sections()
        .flat_map(|(key, section)| {
            section
                .bullets
                .iter()
                .map(move |bullet| (key, section.title.as_str(), bullet))
        })
        .collect()
}
