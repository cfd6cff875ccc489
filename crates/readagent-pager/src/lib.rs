//! Paging, gisting and lookup pipeline.
//!
//! Provides:
//! - Sentence segmentation with a per-unit word bound
//! - Page building guided by a boundary oracle
//! - Page compression into gists
//! - Per-document memory store with JSON snapshots
//! - Lookup-driven memory expansion and answering
//! - The `ReadAgent` facade tying the stages together

pub mod agent;
pub mod gisting;
pub mod lookup;
pub mod pagination;
pub mod segmenter;
pub mod store;

pub use agent::{AgentError, Capabilities, ReadAgent};
pub use gisting::{GistingError, PageCompressor};
pub use lookup::{
    build_shortened_article, expand_view, parse_page_selection, LookupAnswer, LookupEngine,
    LookupError,
};
pub use pagination::{parse_pause_point, PageBuilder, PaginationError};
pub use readagent_types::PaginationConfig;
pub use segmenter::segment;
pub use store::{MemoryStore, SnapshotError, StoreError};
