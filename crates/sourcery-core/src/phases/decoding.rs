//! Phase 2: decode every discovered file into the graph.

use crate::error::Result;
use crate::graph::CallGraph;
use crate::phases::discovery::SourceFile;
use crate::record::decode_file;
use crate::statement::{MethodCallExtractor, Tokenizer};

/// Decode `files` in order, applying each one only after it decoded
/// cleanly. The first error aborts the phase. Returns the file count.
pub fn run_decoding_phase<T: Tokenizer>(
    files: &[SourceFile],
    extractor: &MethodCallExtractor<T>,
    graph: &mut CallGraph,
) -> Result<usize> {
    for file in files {
        log::debug!("decoding {}", file.rel_path);
        let decoded = decode_file(&file.path, extractor)?;
        log::trace!(
            "{}: {} node(s), {} used mark(s)",
            file.rel_path,
            decoded.nodes.len(),
            decoded.used.len()
        );
        graph.apply(decoded);
    }
    Ok(files.len())
}
