//! Sourcery Core: call/reference graph engine for legacy source exports.
//!
//! This crate contains all analysis logic: tagged-record decoding, statement
//! tokenizing, graph assembly, usage enrichment, topology reports and the
//! two graph renderers.

pub mod config;
pub mod error;
pub mod graph;
pub mod output;
pub mod phases;
pub mod pipeline;
pub mod record;
pub mod statement;
