//! Storage backends.
//!
//! - **Vector store**: the document collection the twin retrieves from
//!   ([`VectorStore`], backed by Qdrant or an in-memory store).
//! - **Chat history**: exchanges per session in libsql/Turso
//!   ([`ChatHistoryStore`]).
//!
//! Enable the Qdrant backend via the `qdrant` Cargo feature (on by default).

pub mod history;
pub mod vectorstore;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use history::ChatHistoryStore;
pub use vectorstore::{InMemoryVectorStore, VectorStore};

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantStore;
