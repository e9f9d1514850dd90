pub mod decoding;
pub mod discovery;
pub mod enrichment;
