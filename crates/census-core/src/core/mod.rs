//! # Core Module
//!
//! Stateless building blocks of the census.
//!
//! ## Architecture
//!
//! - **Census Data** ([`models`]) - Work items, raw alignments and per-domain result records
//! - **Significance** ([`significance`]) - Predicates deciding whether a self-alignment is trusted
//! - **Consensus** ([`consensus`]) - Vote histograms, the calibration matrix and order deciders
//! - **File I/O** ([`io`]) - The persisted result store and tab-separated tables
//! - **Geometry** ([`utils`]) - Superposition helpers used to recover symmetry axes
//!
//! Nothing in this module performs alignments or owns long-lived state; the [`crate::engine`]
//! layer drives these types.

pub mod consensus;
pub mod io;
pub mod models;
pub mod significance;
pub mod utils;
