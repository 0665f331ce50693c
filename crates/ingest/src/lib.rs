//! Ingest stage: lists the exported event-log objects, keeps the ones in
//! range and flattens their rows into a single event table.

pub mod extract;
pub mod pipeline;
pub mod selection;
pub mod store;

pub use pipeline::{IngestSummary, Ingestor};
pub use selection::KeySelector;
pub use store::{LocalObjectStore, ObjectStore};
