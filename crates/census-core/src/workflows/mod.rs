//! # Workflows Module
//!
//! High-level entry points of the census library. Each workflow loads its inputs, drives
//! the engine, reports progress and returns a summary the caller can display.
//!
//! ## Architecture
//!
//! - **Census Workflow** ([`census`]) - Runs (or resumes) a census over a list of domains,
//!   replaying self-alignments from a precomputed alignment table.
//! - **Merge Workflow** ([`merge`]) - Concatenates result stores from independent runs and
//!   optionally strips bulky fields.
//! - **Fold Order Workflow** ([`fold_order`]) - Groups stored results by classification and
//!   decides a consensus order per group.

pub mod census;
pub mod fold_order;
pub mod merge;
