//! Batch-import pipeline: entity resolution and temporal event linking.
//!
//! Imports are offline, batch-oriented and single-writer, with
//! delete-then-reinsert semantics per source kind. The ingestion collaborator
//! hands over pre-parsed row batches (rows with unparseable timestamps are
//! dropped before they reach this crate); this crate resolves each row's
//! external identifier to a canonical entity, links it to the
//! nearest-preceding canonical event, and writes the batch through the store.

pub mod error;
pub mod import;
pub mod linker;
pub mod resolver;

pub use error::{Error, Result};
pub use import::{ImportReport, Importer};
pub use linker::EventLinker;
pub use resolver::IdentifierIndex;
