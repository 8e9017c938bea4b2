use std::path::PathBuf;

use thiserror::Error;

use crate::video::domain::video_reader::DecodeError;

/// Fatal failures of an extraction run.
///
/// Everything else (decode errors mid-stream, proposal or recognition
/// failures) ends or degrades the run gracefully and never surfaces here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input could not be opened. No output file was created.
    #[error("open stage failed: {source}")]
    Open {
        #[source]
        source: DecodeError,
    },

    /// The output log could not be created or appended to.
    #[error(
        "write stage failed on {}: {source} ({records_written} records written{})",
        path.display(),
        last_frame_suffix(*last_frame_index)
    )]
    Write {
        path: PathBuf,
        records_written: u64,
        last_frame_index: Option<u64>,
        #[source]
        source: std::io::Error,
    },

    #[error("pipeline already executed")]
    AlreadyExecuted,
}

impl PipelineError {
    /// Records safely on disk when the run stopped.
    pub fn records_written(&self) -> u64 {
        match self {
            PipelineError::Write {
                records_written, ..
            } => *records_written,
            _ => 0,
        }
    }

    /// Last frame whose record was fully written, for resuming a run.
    pub fn last_frame_index(&self) -> Option<u64> {
        match self {
            PipelineError::Write {
                last_frame_index, ..
            } => *last_frame_index,
            _ => None,
        }
    }
}

fn last_frame_suffix(last_frame_index: Option<u64>) -> String {
    match last_frame_index {
        Some(index) => format!(", last frame {index}"),
        None => String::new(),
    }
}
