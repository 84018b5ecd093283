//! # quillmind Core
//!
//! Domain types, traits, and error definitions for the quillmind playbook
//! memory. This crate performs **no I/O**; it defines the data model and the
//! seams (embedding provider, persistence backend) that the other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! External collaborators are traits here. Implementations live in their
//! respective crates. This enables:
//! - Swapping embedders and storage via configuration
//! - Easy testing with table-driven stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod playbook;
pub mod operation;
pub mod embedding;
pub mod storage;

// Re-export key types at crate root for ergonomics
pub use error::{EmbeddingError, StorageError};
pub use playbook::{Bullet, Playbook, Section, SectionKey, PLAYBOOK_VERSION};
pub use operation::{BulletFeedback, DeltaOperation, FeedbackTag, parse_feedback, parse_operations};
pub use embedding::Embedder;
pub use storage::PersistenceBackend;
