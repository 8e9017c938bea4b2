use std::io;
use std::path::Path;

use super::detection_record::DetectionRecord;

/// Persists detection records in the order they are produced.
///
/// `write` must leave the destination readable after every call: a run
/// interrupted between records keeps every record written so far.
pub trait RecordWriter: Send {
    /// Creates (or truncates) the destination.
    fn open(&mut self, path: &Path) -> io::Result<()>;

    fn write(&mut self, record: &DetectionRecord) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}
