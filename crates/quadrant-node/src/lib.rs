//! Node-side storage and retrieval for namespaced data squares.
//!
//! This crate commits extended squares to content-addressed node stores and
//! walks the stored row trees back to the shares of a single namespace.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod fetch;
pub mod header;
pub mod persistence;
pub mod retrieve;
pub mod store;

pub use cache::CachingStore;
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::RetrieverConfig;
pub use fetch::{fetch_node, get_leaf, FetchError};
pub use header::{build_axis, put_square, BuildError, DaHeaderBuilder};
pub use persistence::{
    decode_snapshot, encode_snapshot, load_dah_from_path, load_store_from_path,
    load_store_or_default, save_dah_to_path, save_store_to_path, PersistenceError, StoreSnapshot,
};
pub use retrieve::{
    find_starting_index, retrieve, select_rows, RangeError, RangeRetriever, RetrieveError,
    RowStart,
};
pub use store::{Fault, MemoryStore, NodeStore, StoreError};
