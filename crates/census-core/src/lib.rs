//! # Symmetry Census Core Library
//!
//! A library for running protein symmetry censuses: large batches of self-alignments
//! whose detected rotational orders are persisted, resumed after interruption, and
//! finally aggregated into one consensus order per structural family.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture to keep concerns separate,
//! testable, and easy to extend.
//!
//! - **[`core`]: The Foundation.** Stateless value types (`ResultRecord`, `ResultStore`,
//!   `VoteHistogram`), significance predicates, consensus deciders, and the file formats
//!   they are read from and written to.
//!
//! - **[`engine`]: The Logic Core.** The stateful parts of a census: the resumable,
//!   checkpointing job runner, the group aggregator, the traits behind which the external
//!   aligner, order detector and classification lookup live, and configuration.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (running a census, merging
//!   stores, computing fold orders) that wire configuration, I/O and engine together.

pub mod core;
pub mod engine;
pub mod workflows;
