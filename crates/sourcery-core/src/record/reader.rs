//! Line-oriented reader for the tagged export record format.
//!
//! Every record starts with a four byte tag (`FIL,`, `TXT,`, ...), usually
//! followed by a fixed-width length token (`130,`) and a comma separated
//! payload. `TXT,` is the only multi-line record: its header carries a byte
//! count for the raw text that follows, which is closed by an `XTX,` line.

use std::io::{BufRead, Read};
use std::path::PathBuf;
use std::sync::LazyLock;

use encoding_rs::WINDOWS_1252;
use regex::Regex;

use crate::error::{Error, Result};

static WIDTH_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2,3},").unwrap());

/// Record tags the decoder distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `FIL,` module header.
    File,
    /// `FLD,`
    Field,
    /// `IDX,`
    Index,
    /// `WRK,`
    WorkArea,
    /// `SUB,` and `TBL,`
    Table,
    /// `PPC,` public procedure call.
    ProcedureCall,
    /// `PPD,` public procedure definition boundary.
    ProcedureDefinition,
    /// `LPC,` local procedure call.
    LocalCall,
    /// `TXT,` embedded text header.
    Text,
    /// `XTX,` embedded text terminator.
    TextEnd,
    /// Records with no bearing on the reference graph.
    Ignored,
    Unrecognised,
}

impl Tag {
    pub fn from_prefix(prefix: &[u8]) -> Self {
        match prefix {
            b"FIL," => Self::File,
            b"FLD," => Self::Field,
            b"IDX," => Self::Index,
            b"WRK," => Self::WorkArea,
            b"SUB," | b"TBL," => Self::Table,
            b"PPC," => Self::ProcedureCall,
            b"PPD," => Self::ProcedureDefinition,
            b"LPC," => Self::LocalCall,
            b"TXT," => Self::Text,
            b"XTX," => Self::TextEnd,
            b"GRP," | b"BLK," | b"KLB," | b"VAD," | b"VAR," | b"LPD," | b"AUD," | b"AUT,"
            | b"DBS," | b"OBN," | b"OBP," | b"EQP," | b"DTW," | b"DPW," | b"DLW," | b"DBP,"
            | b"DLD," | b"OBD," | b"DLC," | b"OBC," => Self::Ignored,
            _ => Self::Unrecognised,
        }
    }
}

/// One decoded record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub tag: Tag,
    /// The tag as it appeared, for diagnostics.
    pub raw_tag: String,
    /// Everything after the tag and width token, without the line terminator.
    pub payload: String,
}

impl Record {
    /// First comma-separated field of the payload.
    pub fn name(&self) -> &str {
        self.payload.split(',').next().unwrap_or_default()
    }
}

/// Decode export bytes, which are Windows-1252 encoded.
pub fn decode_bytes(bytes: &[u8]) -> String {
    WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Streams records out of one export file.
pub struct RecordReader<R> {
    inner: R,
    file: String,
    line: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R, file: impl Into<String>) -> Self {
        Self {
            inner,
            file: file.into(),
            line: Vec::new(),
        }
    }

    /// Name of the file being read, as used in error messages.
    pub fn file(&self) -> &str {
        &self.file
    }

    fn read_line(&mut self) -> Result<usize> {
        self.line.clear();
        self.inner
            .read_until(b'\n', &mut self.line)
            .map_err(|e| Error::io(PathBuf::from(&self.file), e))
    }

    /// Read the next record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.read_line()? == 0 {
            return Ok(None);
        }

        let line = trim_line_end(&self.line);
        if line.len() < 4 {
            return Ok(Some(Record {
                tag: Tag::Unrecognised,
                raw_tag: decode_bytes(line),
                payload: String::new(),
            }));
        }

        let (prefix, rest) = line.split_at(4);
        let rest = decode_bytes(rest);
        let payload = match WIDTH_TOKEN.find(&rest) {
            Some(m) => rest[m.end()..].to_string(),
            None => rest,
        };

        Ok(Some(Record {
            tag: Tag::from_prefix(prefix),
            raw_tag: decode_bytes(prefix),
            payload,
        }))
    }

    /// Read the raw text announced by a `TXT,` header and consume the
    /// `XTX,` line that must follow it.
    pub fn read_text(&mut self, header: &Record) -> Result<String> {
        let count_field = header.name().trim();
        let expected: usize = count_field.parse().map_err(|_| Error::MalformedLength {
            file: self.file.clone(),
            value: count_field.to_string(),
        })?;

        let mut body = Vec::with_capacity(expected);
        (&mut self.inner)
            .take(expected as u64)
            .read_to_end(&mut body)
            .map_err(|e| Error::io(PathBuf::from(&self.file), e))?;
        if body.len() < expected {
            return Err(Error::TruncatedText {
                file: self.file.clone(),
                expected,
                actual: body.len(),
            });
        }

        self.read_line()?;
        if !self.line.starts_with(b"XTX,") {
            return Err(Error::MissingTextTerminator {
                file: self.file.clone(),
                found: decode_bytes(trim_line_end(&self.line)),
            });
        }

        Ok(decode_bytes(&body))
    }
}
