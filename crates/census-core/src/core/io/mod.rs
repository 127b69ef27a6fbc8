//! Provides input/output for census data.
//!
//! The result store is persisted as a single JSON document that is atomically replaced on
//! every checkpoint. Alignment and classification tables are tab-separated files produced
//! by external tools.

pub mod store;
pub mod tables;
