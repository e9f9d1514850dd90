//! Decodes one export file into graph nodes.
//!
//! A file holds one module (`FIL,`) or, for public procedure libraries, a
//! header followed by one unit per `PPD,` boundary. Nothing is written to
//! the graph from here: the result is a self-contained [`DecodedFile`] that
//! the caller applies once the whole file decoded cleanly.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::{Node, NodeId, NodeKind};
use crate::error::{Error, Result};
use crate::record::reader::{RecordReader, Tag};
use crate::statement::{MethodCallExtractor, Tokenizer};

/// Everything one export file contributes to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFile {
    /// Flushed units, in flush order.
    pub nodes: Vec<Node>,
    /// Public procedures invoked from this file.
    pub used: Vec<NodeId>,
}

/// `LPC,` seen while decoding: resolvable only against this file's PPDs.
#[derive(Debug, Clone)]
struct LocalCall {
    from: NodeId,
    to: NodeId,
}

/// The unit currently accumulating references.
#[derive(Debug, Default)]
struct Unit {
    id: Option<NodeId>,
    label: String,
    refs: HashSet<NodeId>,
}

impl Unit {
    fn new(id: NodeId, label: &str) -> Self {
        Self {
            id: Some(id),
            label: label.to_string(),
            refs: HashSet::new(),
        }
    }

    fn kind(&self) -> Option<NodeKind> {
        self.id.as_ref().map(|id| id.kind)
    }

    fn add_ref(&mut self, name: &str, kind: NodeKind) {
        self.refs.insert(NodeId::new(name, kind));
    }

    /// How the unit is named in diagnostics.
    fn describe<'a>(&'a self, file: &'a str) -> &'a str {
        match &self.id {
            Some(id) => &id.name,
            None => file,
        }
    }
}

struct FileDecoder<'a, T> {
    file: &'a str,
    extractor: &'a MethodCallExtractor<T>,
    unit: Unit,
    seen_procedure: bool,
    local_calls: Vec<LocalCall>,
    out: DecodedFile,
}

impl<'a, T: Tokenizer> FileDecoder<'a, T> {
    fn new(file: &'a str, extractor: &'a MethodCallExtractor<T>) -> Self {
        Self {
            file,
            extractor,
            unit: Unit::default(),
            seen_procedure: false,
            local_calls: Vec::new(),
            out: DecodedFile::default(),
        }
    }

    fn flush(&mut self) {
        let unit = std::mem::take(&mut self.unit);
        match unit.id {
            None => log::warn!("{}: unit without FIL record not added", self.file),
            Some(id) if id.kind == NodeKind::Unknown => {
                log::warn!("{}: unit '{}' has unknown type, not added", self.file, unit.label)
            }
            Some(id) => self.out.nodes.push(Node {
                id,
                label: unit.label,
                refs: unit.refs,
            }),
        }
    }

    fn procedure_boundary(&mut self, name: &str) -> Result<()> {
        if self.seen_procedure {
            self.flush();
        } else {
            let kind = self.unit.kind().unwrap_or(NodeKind::Unknown);
            if kind != NodeKind::PublicProcedureLibrary {
                return Err(Error::ProcedureOutsideLibrary {
                    file: self.file.to_string(),
                    procedure: name.to_string(),
                    kind,
                });
            }
            if !self.unit.refs.is_empty() {
                return Err(Error::LibraryHeaderHasReferences {
                    file: self.file.to_string(),
                    count: self.unit.refs.len(),
                });
            }
        }

        self.seen_procedure = true;
        self.unit = Unit::new(NodeId::new(name, NodeKind::PublicProcedure), name);
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if self.unit.kind() == Some(NodeKind::PublicProcedureLibrary) {
            return Ok(());
        }
        let methods = self
            .extractor
            .extract(self.unit.describe(self.file), text)?;
        for method in methods {
            self.unit.add_ref(&method, NodeKind::Method);
        }
        Ok(())
    }

    fn run<R: BufRead>(mut self, reader: &mut RecordReader<R>) -> Result<DecodedFile> {
        while let Some(record) = reader.next_record()? {
            match record.tag {
                Tag::File => {
                    let (id, label) = NodeId::from_module_name(record.name());
                    self.unit = Unit::new(id, &label);
                }
                Tag::Field => self.unit.add_ref(record.name(), NodeKind::Field),
                Tag::Index => self.unit.add_ref(record.name(), NodeKind::Index),
                Tag::WorkArea => self.unit.add_ref(record.name(), NodeKind::WorkArea),
                Tag::Table => self.unit.add_ref(record.name(), NodeKind::Table),
                Tag::ProcedureCall => {
                    self.unit.add_ref(record.name(), NodeKind::PublicProcedure);
                    self.out
                        .used
                        .push(NodeId::new(record.name(), NodeKind::PublicProcedure));
                }
                Tag::ProcedureDefinition => self.procedure_boundary(record.name())?,
                Tag::LocalCall => match &self.unit.id {
                    Some(from) => self.local_calls.push(LocalCall {
                        from: from.clone(),
                        to: NodeId::new(record.name(), NodeKind::PublicProcedure),
                    }),
                    None => log::debug!("{}: LPC outside any unit dropped", self.file),
                },
                Tag::Text => {
                    let text = reader.read_text(&record)?;
                    self.text(&text)?;
                }
                Tag::TextEnd | Tag::Ignored => {}
                Tag::Unrecognised => {
                    log::warn!("{}: skipping unrecognised record '{}'", self.file, record.raw_tag)
                }
            }
        }

        if self.unit.kind() != Some(NodeKind::PublicProcedureLibrary) {
            self.flush();
        }

        self.resolve_local_calls();
        Ok(self.out)
    }

    /// Turn LPCs that target a procedure defined in this same file into
    /// public procedure references; everything else is dropped.
    fn resolve_local_calls(&mut self) {
        let defined: HashSet<NodeId> = self
            .out
            .nodes
            .iter()
            .filter(|n| n.id.kind == NodeKind::PublicProcedure)
            .map(|n| n.id.clone())
            .collect();

        for call in std::mem::take(&mut self.local_calls) {
            if !defined.contains(&call.to) {
                log::debug!(
                    "{}: local call {} -> {} has no local definition",
                    self.file,
                    call.from,
                    call.to
                );
                continue;
            }
            // Last decode wins, so a repeated definition resolves to the later one.
            let Some(caller) = self.out.nodes.iter_mut().rev().find(|n| n.id == call.from) else {
                log::debug!("{}: local call from unflushed unit {} dropped", self.file, call.from);
                continue;
            };
            caller.refs.insert(call.to.clone());
            self.out.used.push(call.to);
        }
    }
}

/// Decode records from `reader`; `file` names the source in diagnostics.
pub fn decode<R: BufRead, T: Tokenizer>(
    reader: R,
    file: &str,
    extractor: &MethodCallExtractor<T>,
) -> Result<DecodedFile> {
    let mut records = RecordReader::new(reader, file);
    FileDecoder::new(file, extractor).run(&mut records)
}

/// Open and decode one export file.
pub fn decode_file<T: Tokenizer>(
    path: &Path,
    extractor: &MethodCallExtractor<T>,
) -> Result<DecodedFile> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    decode(BufReader::new(file), &path.to_string_lossy(), extractor)
}
