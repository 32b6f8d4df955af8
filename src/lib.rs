//! Streaming aggregation over large book-review datasets.
//!
//! The dataset is read in bounded windows ([`source`]), cleaned, and folded
//! into per-key running totals ([`aggregate`]) or a bounded sample
//! ([`sample`]). Totals are finalized into ordered rows, optionally joined
//! with a metadata table ([`combine`]), and written as CSV ([`sink`]).
//! [`pipeline`] wires these into the titles, timeline, genres and sentiment
//! analyses.

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod pipeline;
pub mod sample;
pub mod sentiment;
pub mod sink;
pub mod source;
