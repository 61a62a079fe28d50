//! Reading alert events from newline-delimited JSON files.
//!
//! Event files may be plain text or gzip-compressed. Compression is detected
//! by the `.gz` extension first, then by the gzip magic bytes, so a renamed
//! compressed file still opens correctly.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::types::AlertEvent;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors raised while reading an event file.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    /// Underlying file could not be opened or read.
    #[error("i/o error reading event file: {0}")]
    Io(#[from] std::io::Error),

    /// A line did not parse as a well-formed alert event.
    #[error("invalid event at line {line}: {source}")]
    Parse {
        /// 1-based line number within the file.
        line: usize,
        /// The JSON/schema error for the line.
        source: serde_json::Error,
    },
}

/// Streaming reader over a newline-delimited JSON event file.
pub struct EventReader {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    line: usize,
}

impl EventReader {
    /// Opens an event file, transparently decompressing gzip input.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        let gzipped = Self::is_gzipped(&path, &mut file)?;
        let reader: Box<dyn BufRead> = if gzipped {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self { path, reader, line: 0 })
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_gzipped(path: &Path, file: &mut File) -> Result<bool, IngestError> {
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz")) {
            return Ok(true);
        }

        let mut magic = [0u8; 2];
        let read = file.read(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(read == 2 && magic == GZIP_MAGIC)
    }
}

impl Iterator for EventReader {
    type Item = Result<AlertEvent, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut buf = String::new();
            match self.reader.read_line(&mut buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(IngestError::Io(e))),
            }
            self.line += 1;

            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str::<AlertEvent>(trimmed)
                    .map_err(|source| IngestError::Parse { line: self.line, source }),
            );
        }
    }
}
