use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{DecodeError, VideoReader};

type ReadResult = Result<Option<Frame>, DecodeError>;

/// Decorator that decodes ahead of the consumer on a dedicated thread.
///
/// Up to `capacity` frames are buffered in a bounded channel. Order,
/// end-of-stream and read errors pass through unchanged, so callers see
/// exactly the sequence the wrapped reader would have produced.
pub struct PrefetchReader {
    inner: Option<Box<dyn VideoReader>>,
    capacity: usize,
    frame_rx: Option<crossbeam_channel::Receiver<ReadResult>>,
    handle: Option<JoinHandle<Box<dyn VideoReader>>>,
    stop: Arc<AtomicBool>,
    received: u64,
    finished: bool,
}

impl PrefetchReader {
    pub fn new(inner: Box<dyn VideoReader>, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            capacity: capacity.max(1),
            frame_rx: None,
            handle: None,
            stop: Arc::new(AtomicBool::new(false)),
            received: 0,
            finished: false,
        }
    }
}

impl VideoReader for PrefetchReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, DecodeError> {
        self.close();
        let mut reader = self.inner.take().ok_or_else(|| DecodeError::Open {
            path: path.display().to_string(),
            reason: "prefetch worker did not return its reader".to_string(),
        })?;

        let metadata = match reader.open(path) {
            Ok(m) => m,
            Err(e) => {
                self.inner = Some(reader);
                return Err(e);
            }
        };

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<ReadResult>(self.capacity);
        self.stop = Arc::new(AtomicBool::new(false));
        self.handle = Some(spawn_decoder(reader, frame_tx, self.stop.clone()));
        self.frame_rx = Some(frame_rx);
        self.received = 0;
        self.finished = false;

        Ok(metadata)
    }

    fn read_next(&mut self) -> ReadResult {
        let rx = self.frame_rx.as_ref().ok_or(DecodeError::NotOpened)?;
        if self.finished {
            return Ok(None);
        }

        match rx.recv() {
            Ok(Ok(Some(frame))) => {
                self.received += 1;
                Ok(Some(frame))
            }
            Ok(other) => {
                self.finished = true;
                other
            }
            Err(_) => {
                self.finished = true;
                Err(DecodeError::Read {
                    frames_read: self.received,
                    reason: "prefetch worker stopped unexpectedly".to_string(),
                })
            }
        }
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // Dropping the receiver unblocks a worker waiting on a full channel.
        self.frame_rx = None;
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(reader) => self.inner = Some(reader),
                Err(_) => log::error!("Prefetch worker panicked"),
            }
        }
    }
}

impl Drop for PrefetchReader {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_decoder(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<ReadResult>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            let result = reader.read_next();
            let last = !matches!(result, Ok(Some(_)));
            if frame_tx.send(result).is_err() || last {
                break;
            }
        }
        reader.close();
        reader
    })
}
