//! Knowledge store implementation for Folio.
//!
//! Document loading, splitting, index building, and vector lookup. The
//! builder keeps a persisted SQLite embedding index in sync with a source
//! directory; the retriever serves top-k cosine lookups against it.

pub mod builder;
pub mod loader;
pub mod retriever;
pub mod splitter;
pub mod store;
pub mod vector;

pub use builder::KnowledgeStoreBuilder;
pub use loader::{load_documents, merge_sidecar_metadata, sample_document, SourceDocument};
pub use retriever::IndexRetriever;
pub use splitter::{split_by_window, split_documents, split_on_headings};
pub use store::IndexStore;
pub use vector::{cosine_similarity, rank_by_similarity};
