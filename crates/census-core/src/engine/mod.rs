//! # Engine Module
//!
//! The stateful side of a census: running alignment jobs and aggregating their results.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Runner, consensus and aggregation settings with builders
//! - **Collaborators** ([`collaborators`]) - Traits for the external aligner, order detector and
//!   classification lookup, plus the built-in implementations
//! - **Job Runner** ([`runner`]) - The resumable, checkpointing census runner
//! - **Aggregation** ([`aggregate`]) - Per-group vote histograms and consensus orders
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//! - **Error Handling** ([`error`]) - Fatal engine errors
//!
//! Per-item failures (an alignment that does not converge, a missing structure, a timeout)
//! never leave the runner as errors; they are logged and recorded according to the
//! configured [`config::FailurePolicy`].

pub mod aggregate;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod progress;
pub mod runner;
