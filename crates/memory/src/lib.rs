//! Evolving playbook memory for quillmind.
//!
//! Section classification, durable per-work storage, dedup-aware delta
//! updates, retrieval, token-budgeted rendering and usage tracking.

pub mod classifier;
pub mod delta;
pub mod embeddings;
pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod render;
pub mod retriever;
pub mod service;
pub mod store;
pub mod token;
pub mod usage;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::classify;
pub use delta::{DeltaApplier, DeltaOutcome};
pub use embeddings::Embeddings;
pub use file_backend::FileBackend;
pub use in_memory::InMemoryBackend;
pub use noop::NoopBackend;
pub use render::{Rendered, render_curator_view, render_injection_view};
pub use retriever::{Retriever, SelectedBullet};
pub use service::{Injection, PlaybookService, PlaybookStats, SectionStats};
pub use store::{BulletStore, allocate_id, repair, storage_key};
pub use token::estimate_tokens;
pub use usage::{UsageTracker, apply_feedback, record_hits};
pub use vector::{cosine_similarity, most_similar};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
