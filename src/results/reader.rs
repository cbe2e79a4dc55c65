use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{AppError, AppResult, ResultsError};

use super::header::ColumnIndex;
use super::{GRINDER_ERROR_MESSAGE, Sample};

/// Upper bound for one incremental read so a poll tick stays short.
const READ_CHUNK_BYTES: u64 = 1024 * 1024;
const DEFAULT_DELIMITER: char = ',';

/// Follows a KPI log written by another process.
///
/// The file is opened lazily: until it exists and holds a complete header
/// line every call to [`ResultLogReader::produce`] yields nothing. Afterwards
/// each call continues at the byte offset where the previous one stopped, so
/// rows are never emitted twice. A trailing line without a terminator is kept
/// back and completed by the next read, and lines left unconsumed by a dropped
/// [`Samples`] are handed out first next time.
#[derive(Debug)]
pub struct ResultLogReader {
    path: PathBuf,
    delimiter: char,
    source: Option<OpenLog>,
    partial: Vec<u8>,
    pending: VecDeque<String>,
    produced: u64,
}

#[derive(Debug)]
struct OpenLog {
    file: File,
    columns: ColumnIndex,
    offset: u64,
}

impl ResultLogReader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
            source: None,
            partial: Vec::new(),
            pending: VecDeque::new(),
            produced: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next unread data in the log.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.source.as_ref().map_or(0, |source| source.offset)
    }

    /// Number of samples handed out so far.
    #[must_use]
    pub const fn produced(&self) -> u64 {
        self.produced
    }

    #[must_use]
    pub fn columns(&self) -> Option<&ColumnIndex> {
        self.source.as_ref().map(|source| &source.columns)
    }

    /// Reads whatever was appended since the last call.
    ///
    /// Incremental calls read at most about one MiB; with `last_pass` the rest
    /// of the file is read. Rows are parsed lazily as the returned iterator is
    /// consumed; rows the iterator did not reach stay queued for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::MissingColumn`] when the header lacks a required
    /// column. A missing, empty or unreadable file is not an error.
    pub fn produce(&mut self, last_pass: bool) -> AppResult<Samples<'_>> {
        if self.source.is_none() {
            self.source = self.open()?;
        }

        let Some(source) = self.source.as_mut() else {
            debug!("No data to start reading yet: {}", self.path.display());
            return Ok(Samples::empty(&mut self.pending, &mut self.produced));
        };

        debug!("Reading grinder results from offset {}", source.offset);
        let chunk = match read_chunk(source, last_pass) {
            Ok(chunk) => chunk,
            Err(err) => {
                debug!("Results log not readable right now: {}", err);
                return Ok(Samples::empty(&mut self.pending, &mut self.produced));
            }
        };

        self.pending
            .extend(split_complete_lines(&mut self.partial, &chunk));
        Ok(Samples {
            lines: &mut self.pending,
            columns: Some(&source.columns),
            delimiter: self.delimiter,
            produced: &mut self.produced,
        })
    }

    fn open(&self) -> AppResult<Option<OpenLog>> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) | Err(_) => {
                debug!("File not appeared yet: {}", self.path.display());
                return Ok(None);
            }
        };
        if metadata.len() == 0 {
            debug!("File is empty: {}", self.path.display());
            return Ok(None);
        }

        let Ok(file) = File::open(&self.path) else {
            debug!("File not readable yet: {}", self.path.display());
            return Ok(None);
        };
        let mut header = String::new();
        let header_len = match BufReader::new(&file).read_line(&mut header) {
            Ok(len) => len,
            Err(err) => {
                debug!("Header not readable yet: {}", err);
                return Ok(None);
            }
        };
        if !header.ends_with('\n') {
            debug!("Header line is still being written: {}", self.path.display());
            return Ok(None);
        }

        let columns = ColumnIndex::from_header(&header, self.delimiter, &self.path)
            .map_err(AppError::results)?;
        debug!("Results log has {} columns", columns.len());
        Ok(Some(OpenLog {
            file,
            columns,
            offset: u64::try_from(header_len).unwrap_or(u64::MAX),
        }))
    }
}

fn read_chunk(source: &mut OpenLog, last_pass: bool) -> Result<Vec<u8>, ResultsError> {
    // Always seek: some platforms return empty reads after growth otherwise.
    source
        .file
        .seek(SeekFrom::Start(source.offset))
        .map_err(|err| ResultsError::Io {
            context: "seek results log",
            source: err,
        })?;
    let mut chunk = Vec::new();
    let read = if last_pass {
        (&source.file).read_to_end(&mut chunk)
    } else {
        (&source.file).take(READ_CHUNK_BYTES).read_to_end(&mut chunk)
    }
    .map_err(|err| ResultsError::Io {
        context: "read results log",
        source: err,
    })?;
    source.offset = source
        .offset
        .saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
    Ok(chunk)
}

/// Splits `chunk` into terminated lines, prefixing the carried-over fragment.
/// Whatever follows the last terminator becomes the new fragment.
fn split_complete_lines(partial: &mut Vec<u8>, chunk: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = chunk;
    while let Some(pos) = rest.iter().position(|byte| *byte == b'\n') {
        let (line, tail) = rest.split_at(pos);
        partial.extend_from_slice(line);
        lines.push(String::from_utf8_lossy(partial).into_owned());
        partial.clear();
        rest = tail.get(1..).unwrap_or_default();
    }
    partial.extend_from_slice(rest);
    lines
}

/// Lazily parsed samples from one read of the log.
#[derive(Debug)]
pub struct Samples<'reader> {
    lines: &'reader mut VecDeque<String>,
    columns: Option<&'reader ColumnIndex>,
    delimiter: char,
    produced: &'reader mut u64,
}

impl<'reader> Samples<'reader> {
    fn empty(lines: &'reader mut VecDeque<String>, produced: &'reader mut u64) -> Self {
        Self {
            lines,
            columns: None,
            delimiter: DEFAULT_DELIMITER,
            produced,
        }
    }
}

impl Iterator for Samples<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let columns = self.columns?;
        while let Some(line) = self.lines.pop_front() {
            let line = line.trim();
            if let Some(sample) = parse_row(line, columns, self.delimiter) {
                *self.produced = self.produced.saturating_add(1);
                return Some(sample);
            }
            debug!("Skipping line: {}", line);
        }
        None
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

fn parse_row(line: &str, columns: &ColumnIndex, delimiter: char) -> Option<Sample> {
    let fields: Vec<&str> = line.split(delimiter).collect();
    // Data rows carry the run number in the second column.
    if !fields.get(1).is_some_and(|field| is_digits(field.trim())) {
        return None;
    }
    let millis = |idx: usize| -> Option<u64> { fields.get(idx)?.trim().parse::<u64>().ok() };

    let start_ms = millis(columns.start_time)?;
    let response_time = Duration::from_millis(millis(columns.test_time)?);
    let latency = Duration::from_millis(millis(columns.first_byte)?);
    let connect_time = Duration::from_millis(millis(columns.resolve_host)?)
        .saturating_add(Duration::from_millis(millis(columns.connect)?));
    let response_code = fields.get(columns.response_code)?.trim().to_owned();
    let errors = fields.get(columns.errors)?.trim().parse::<i64>().ok()?;

    Some(Sample {
        timestamp: start_ms / 1000,
        label: String::new(),
        concurrency: None,
        response_time,
        connect_time,
        latency,
        response_code,
        error: (errors != 0).then(|| GRINDER_ERROR_MESSAGE.to_owned()),
        extra: String::new(),
    })
}
