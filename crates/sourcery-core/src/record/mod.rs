//! Tagged export record format: reading and per-file decoding.

pub mod decoder;
pub mod reader;

pub use decoder::{decode, decode_file, DecodedFile};
pub use reader::{Record, RecordReader, Tag};
