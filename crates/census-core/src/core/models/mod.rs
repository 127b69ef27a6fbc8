//! # Census Models
//!
//! Value types describing the input and output of a census.
//!
//! - [`work`] - Work items: a domain identifier plus its position in the input list
//! - [`alignment`] - The raw self-alignment handed over by an external aligner
//! - [`record`] - The outcome of one self-alignment job, its scores, mapping and axis

pub mod alignment;
pub mod record;
pub mod work;
