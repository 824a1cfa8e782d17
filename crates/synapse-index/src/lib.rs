//! Repository acquisition, chunking, embedding, and vector retrieval.
//!
//! Turns a remote git repository into a per-project Qdrant collection of text
//! chunks, and answers top-K similarity queries against it.

pub mod chunker;
pub mod error;
pub mod indexer;
pub mod repo;
pub mod retriever;
pub mod store;

pub use error::{IndexError, Result};
