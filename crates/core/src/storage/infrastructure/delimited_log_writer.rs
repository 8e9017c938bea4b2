use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::shared::constants::BLOCK_DELIMITER;
use crate::storage::domain::detection_record::{normalize_text, DetectionRecord};
use crate::storage::domain::record_writer::RecordWriter;

/// Writes records as delimiter-separated text blocks:
///
/// ```text
/// =============
/// frame=300
/// time=10.00s
///
/// LIV 2-1 MCI
/// 45:12
///
/// ```
///
/// Each block is written in one call and flushed before `write` returns.
pub struct DelimitedLogWriter {
    out: Option<BufWriter<File>>,
    records_written: u64,
}

impl DelimitedLogWriter {
    pub fn new() -> Self {
        Self {
            out: None,
            records_written: 0,
        }
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl Default for DelimitedLogWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordWriter for DelimitedLogWriter {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.out = Some(BufWriter::new(File::create(path)?));
        self.records_written = 0;
        Ok(())
    }

    fn write(&mut self, record: &DetectionRecord) -> io::Result<()> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "log writer not open"))?;
        out.write_all(render_block(record).as_bytes())?;
        out.flush()?;
        self.records_written += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

/// Renders one record as a complete block, trailing newline included.
///
/// Texts go through [`normalize_text`] again, so records built field by
/// field cannot break the block structure either.
pub fn render_block(record: &DetectionRecord) -> String {
    let mut block = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(block, "{BLOCK_DELIMITER}");
    let _ = writeln!(block, "frame={}", record.frame_index);
    let _ = writeln!(block, "time={:.2}s", record.timestamp_seconds);
    block.push('\n');
    for text in record.texts.iter().filter_map(|t| normalize_text(t)) {
        block.push_str(&text);
        block.push('\n');
    }
    block.push('\n');
    block
}

/// Writes `records` to `path` in one go, replacing any existing file.
///
/// Uses the same block format and per-record flush as streaming writes.
pub fn save_records(path: &Path, records: &[DetectionRecord]) -> io::Result<()> {
    let mut writer = DelimitedLogWriter::new();
    writer.open(path)?;
    for record in records {
        writer.write(record)?;
    }
    writer.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::stream_position::StreamPosition;

    fn record(index: u64, texts: &[&str]) -> DetectionRecord {
        DetectionRecord::new(StreamPosition::new(index, 30.0), texts.iter().copied())
    }

    #[test]
    fn test_render_block_with_texts() {
        let block = render_block(&record(300, &["LIV 2-1 MCI", "45:12"]));
        assert_eq!(
            block,
            "=============\nframe=300\ntime=10.00s\n\nLIV 2-1 MCI\n45:12\n\n"
        );
    }

    #[test]
    fn test_render_block_without_texts() {
        let block = render_block(&record(0, &[]));
        assert_eq!(block, "=============\nframe=0\ntime=0.00s\n\n\n");
    }

    #[test]
    fn test_render_time_has_two_decimals() {
        let block = render_block(&record(1, &[]));
        assert!(block.contains("time=0.03s\n"), "{block}");
    }

    #[test]
    fn test_render_skips_blank_texts_set_directly() {
        let rec = DetectionRecord {
            frame_index: 9,
            timestamp_seconds: 0.3,
            texts: vec!["A".to_string(), "  ".to_string(), String::new()],
        };
        assert_eq!(render_block(&rec), "=============\nframe=9\ntime=0.30s\n\nA\n\n");
    }

    #[test]
    fn test_render_never_emits_delimiter_as_text() {
        let rec = DetectionRecord {
            frame_index: 3,
            timestamp_seconds: 0.1,
            texts: vec![
                "=============".to_string(),
                "HOME\n=============".to_string(),
            ],
        };
        assert_eq!(
            render_block(&rec),
            "=============\nframe=3\ntime=0.10s\n\nHOME =============\n\n"
        );
    }

    #[test]
    fn test_write_is_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut writer = DelimitedLogWriter::new();
        writer.open(&path).unwrap();
        writer.write(&record(30, &["2-1"])).unwrap();

        let on_disk = fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, render_block(&record(30, &["2-1"])));
        assert_eq!(writer.records_written(), 1);
        writer.close().unwrap();
    }

    #[test]
    fn test_open_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "stale content\n").unwrap();

        let mut writer = DelimitedLogWriter::new();
        writer.open(&path).unwrap();
        writer.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("day1").join("log.txt");
        let mut writer = DelimitedLogWriter::new();
        writer.open(&path).unwrap();
        writer.close().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_before_open_fails() {
        let mut writer = DelimitedLogWriter::new();
        let err = writer.write(&record(0, &[])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut writer = DelimitedLogWriter::new();
        writer.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_save_records_matches_streaming_output() {
        let dir = tempfile::tempdir().unwrap();
        let batch_path = dir.path().join("batch.txt");
        let stream_path = dir.path().join("stream.txt");
        let records = vec![record(0, &["A"]), record(30, &[]), record(60, &["B", "C"])];

        save_records(&batch_path, &records).unwrap();

        let mut writer = DelimitedLogWriter::new();
        writer.open(&stream_path).unwrap();
        for r in &records {
            writer.write(r).unwrap();
        }
        writer.close().unwrap();

        assert_eq!(
            fs::read(&batch_path).unwrap(),
            fs::read(&stream_path).unwrap()
        );
    }
}
