//! Embedding provider implementations for quillmind.
//!
//! All providers implement the `quillmind_core::Embedder` trait.
//! `build_embedder` selects the correct provider based on configuration.

pub mod hashing;
pub mod openai_compat;
pub mod router;

pub use hashing::HashingEmbedder;
pub use openai_compat::OpenAiCompatEmbedder;
pub use router::build_embedder;
