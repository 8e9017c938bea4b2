use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::BLOCK_DELIMITER;
use crate::storage::domain::detection_record::DetectionRecord;

#[derive(Error, Debug)]
pub enum LogParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: content before the first block delimiter")]
    OutsideBlock { line: usize },
    #[error("line {line}: expected `{key}=` field")]
    MissingField { line: usize, key: &'static str },
    #[error("line {line}: invalid {key} value `{value}`")]
    InvalidValue {
        line: usize,
        key: &'static str,
        value: String,
    },
}

/// Reads a detection log written by `DelimitedLogWriter`.
pub fn read_log(path: &Path) -> Result<Vec<DetectionRecord>, LogParseError> {
    let text = fs::read_to_string(path).map_err(|source| LogParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_log(&text)
}

/// Splits `text` on delimiter lines and rebuilds one record per block.
///
/// Blank lines inside a block's text section are ignored, since the
/// writer never emits blank texts.
pub fn parse_log(text: &str) -> Result<Vec<DetectionRecord>, LogParseError> {
    let mut records = Vec::new();
    let mut block: Option<Block<'_>> = None;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if line == BLOCK_DELIMITER {
            if let Some(done) = block.take() {
                records.push(done.into_record()?);
            }
            block = Some(Block::new(line_no));
            continue;
        }
        match block.as_mut() {
            Some(b) => b.lines.push(line),
            None if line.trim().is_empty() => {}
            None => return Err(LogParseError::OutsideBlock { line: line_no }),
        }
    }

    if let Some(done) = block {
        records.push(done.into_record()?);
    }
    Ok(records)
}

struct Block<'a> {
    delimiter_line: usize,
    lines: Vec<&'a str>,
}

impl<'a> Block<'a> {
    fn new(delimiter_line: usize) -> Self {
        Self {
            delimiter_line,
            lines: Vec::new(),
        }
    }

    fn into_record(self) -> Result<DetectionRecord, LogParseError> {
        let frame_line = self.delimiter_line + 1;
        let time_line = self.delimiter_line + 2;

        let frame_value = field(self.lines.first(), "frame", frame_line)?;
        let frame_index = frame_value
            .parse::<u64>()
            .map_err(|_| invalid(frame_line, "frame", frame_value))?;

        let time_value = field(self.lines.get(1), "time", time_line)?;
        let timestamp_seconds = time_value
            .strip_suffix('s')
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| invalid(time_line, "time", time_value))?;

        let texts = self
            .lines
            .iter()
            .skip(2)
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect();

        Ok(DetectionRecord {
            frame_index,
            timestamp_seconds,
            texts,
        })
    }
}

fn field<'a>(
    line: Option<&&'a str>,
    key: &'static str,
    line_no: usize,
) -> Result<&'a str, LogParseError> {
    line.copied()
        .and_then(|l| l.strip_prefix(key))
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(LogParseError::MissingField { line: line_no, key })
}

fn invalid(line: usize, key: &'static str, value: &str) -> LogParseError {
    LogParseError::InvalidValue {
        line,
        key,
        value: value.to_string(),
    }
}
