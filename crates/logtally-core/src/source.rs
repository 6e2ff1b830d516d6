use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AnalysisError, SourceError};

/// One service's log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub service: String,
    pub path: PathBuf,
}

impl LogSource {
    pub fn new(service: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            service: service.into(),
            path: path.into(),
        }
    }

    /// Open the file for line-by-line reading.
    pub fn open(&self) -> Result<LossyLines<BufReader<File>>, SourceError> {
        let file = File::open(&self.path).map_err(|source| SourceError::Open {
            service: self.service.clone(),
            source,
        })?;
        Ok(LossyLines::new(BufReader::new(file)))
    }
}

/// A directory holding one log file per service.
#[derive(Debug, Clone)]
pub struct LogDirectory {
    dir: PathBuf,
    extension: String,
}

impl LogDirectory {
    /// `extension` is given without the leading dot, e.g. `"log"`.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List every regular file in the directory, sorted by file name.
    ///
    /// Sub-directories are skipped. Files without the extension are still
    /// listed, under their full file name.
    pub fn scan(&self) -> Result<Vec<LogSource>, AnalysisError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| AnalysisError::LogDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut sources = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| AnalysisError::LogDir {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            let service = service_name(&file_name, &self.extension);
            debug!(service = %service, path = ?path, "Found log source");
            sources.push(LogSource::new(service, path));
        }

        sources.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(sources)
    }
}

/// `fa-request.log` -> `fa-request`.
pub fn service_name(file_name: &str, extension: &str) -> String {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    file_name
        .strip_suffix(suffix.as_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name)
        .to_string()
}

/// Line iterator that replaces invalid UTF-8 instead of failing, and strips
/// the line terminator.
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
