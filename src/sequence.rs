//! FASTA/FASTQ input: decoded read sequences from a list of files, one file
//! at a time, in the order given.

use needletail::{FastxReader, parse_fastx_reader};
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{MirrorError, Result};

/// Iterator over the sequences of every input file.
///
/// A file that cannot be opened is a fatal `Io` error. A record the parser
/// rejects yields `MirrorError::Decode` and ends that file; iteration
/// resumes with the next one.
pub struct FastxSource {
    paths: Vec<PathBuf>,
    next_path: usize,
    current: Option<(PathBuf, Box<dyn FastxReader>)>,
}

impl FastxSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next_path: 0,
            current: None,
        }
    }

    fn open_next(&mut self) -> Option<Result<()>> {
        let path = self.paths.get(self.next_path)?.clone();
        self.next_path += 1;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                return Some(Err(MirrorError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {e}", path.display()),
                ))));
            }
        };
        match parse_fastx_reader(file) {
            Ok(reader) => {
                debug!(path = %path.display(), "reading sequences");
                self.current = Some((path, reader));
                Some(Ok(()))
            }
            Err(e) => Some(Err(MirrorError::Decode(format!("{}: {e}", path.display())))),
        }
    }
}

impl Iterator for FastxSource {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                if let Err(e) = self.open_next()? {
                    return Some(Err(e));
                }
                continue;
            }
            let Some((path, reader)) = self.current.as_mut() else {
                continue;
            };
            let step = match reader.next() {
                Some(Ok(rec)) => Ok(Some(rec.seq().into_owned())),
                Some(Err(e)) => Err(format!("{}: {e}", path.display())),
                None => Ok(None),
            };
            match step {
                Ok(Some(seq)) => return Some(Ok(seq)),
                Ok(None) => self.current = None,
                Err(msg) => {
                    self.current = None;
                    return Some(Err(MirrorError::Decode(msg)));
                }
            }
        }
    }
}
