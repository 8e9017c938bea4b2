use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::sampling::frame_sampler::{FrameSampler, SamplerStop};
use crate::sampling::sample_window::{SampleWindow, SamplingConfig};
use crate::shared::video_metadata::VideoMetadata;
use crate::storage::domain::record_writer::RecordWriter;
use crate::video::domain::video_reader::VideoReader;

use super::detection_aggregator::DetectionAggregator;
use super::pipeline_error::PipelineError;
use super::pipeline_logger::PipelineLogger;

/// Why a run ended without a fatal error.
#[derive(Clone, Debug, PartialEq)]
pub enum StopReason {
    EndOfStream,
    /// The configured end time was reached.
    WindowEnd,
    /// The decoder failed mid-stream. Everything sampled before it was kept.
    DecodeFailed(String),
    Cancelled,
}

impl From<SamplerStop> for StopReason {
    fn from(stop: SamplerStop) -> Self {
        match stop {
            SamplerStop::EndOfStream => StopReason::EndOfStream,
            SamplerStop::WindowEnd => StopReason::WindowEnd,
            SamplerStop::DecodeFailed(reason) => StopReason::DecodeFailed(reason),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub records_written: u64,
    /// Frame index of the last record written, if any.
    pub last_frame_index: Option<u64>,
    /// Frames pulled from the decoder, sampled or discarded.
    pub frames_decoded: u64,
    pub stop_reason: StopReason,
}

/// Samples a video, reads text from each sampled frame, and streams one
/// record per frame to the output log.
///
/// Single-use: `execute` consumes the reader, aggregator and writer, so
/// a second call returns [`PipelineError::AlreadyExecuted`]. The reader is
/// closed on every exit path, and the writer on every path after it was
/// opened.
pub struct ExtractTextUseCase {
    reader: Option<Box<dyn VideoReader>>,
    aggregator: Option<DetectionAggregator>,
    writer: Option<Box<dyn RecordWriter>>,
    logger: Box<dyn PipelineLogger>,
    sampling: SamplingConfig,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    cancelled: Arc<AtomicBool>,
}

impl ExtractTextUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        aggregator: DetectionAggregator,
        writer: Box<dyn RecordWriter>,
        logger: Box<dyn PipelineLogger>,
        sampling: SamplingConfig,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            aggregator: Some(aggregator),
            writer: Some(writer),
            logger,
            sampling,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn execute(&mut self, input: &Path, output: &Path) -> Result<RunSummary, PipelineError> {
        let mut reader = self.reader.take().ok_or(PipelineError::AlreadyExecuted)?;
        let mut aggregator = self.aggregator.take().ok_or(PipelineError::AlreadyExecuted)?;
        let mut writer = self.writer.take().ok_or(PipelineError::AlreadyExecuted)?;

        let metadata = match reader.open(input) {
            Ok(m) => m,
            Err(source) => {
                reader.close();
                return Err(PipelineError::Open { source });
            }
        };
        self.logger.info(&format!(
            "Opened {} ({}x{}, {:.2} fps, {} frames, {})",
            input.display(),
            metadata.width,
            metadata.height,
            metadata.frame_rate(),
            metadata.total_frames,
            metadata.codec
        ));

        let result = self.run(
            reader.as_mut(),
            &mut aggregator,
            writer.as_mut(),
            &metadata,
            output,
        );
        reader.close();
        result
    }

    fn run(
        &mut self,
        reader: &mut dyn VideoReader,
        aggregator: &mut DetectionAggregator,
        writer: &mut dyn RecordWriter,
        metadata: &VideoMetadata,
        output: &Path,
    ) -> Result<RunSummary, PipelineError> {
        let window = SampleWindow::resolve(&self.sampling, metadata);
        let total = window.expected_samples().unwrap_or(0) as usize;
        self.logger.info(&format!(
            "Sampling every {} frames from frame {} to {}",
            window.cadence_frames,
            window.start_frame,
            window
                .end_frame
                .map_or_else(|| "end of stream".to_string(), |end| format!("frame {end}"))
        ));

        writer
            .open(output)
            .map_err(|source| write_error(output, 0, None, source))?;

        let mut sampler = FrameSampler::new(reader, window, metadata.frame_rate());
        let mut records_written = 0u64;
        let mut last_frame_index = None;
        let mut cancelled = false;

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                self.logger
                    .info(&format!("Cancelled after {records_written} records"));
                cancelled = true;
                break;
            }

            let t0 = Instant::now();
            let Some(sampled) = sampler.next() else {
                break;
            };
            self.logger
                .timing("decode", t0.elapsed().as_secs_f64() * 1000.0);

            let record = aggregator.aggregate(&sampled, self.logger.as_mut());

            let t0 = Instant::now();
            if let Err(source) = writer.write(&record) {
                if let Err(e) = writer.close() {
                    log::warn!("Failed to close {} after write error: {e}", output.display());
                }
                return Err(write_error(output, records_written, last_frame_index, source));
            }
            self.logger
                .timing("write", t0.elapsed().as_secs_f64() * 1000.0);

            records_written += 1;
            last_frame_index = Some(record.frame_index);

            let current = records_written as usize;
            self.logger.progress(current, total);
            if let Some(ref cb) = self.on_progress {
                if !cb(current, total) {
                    self.cancelled.store(true, Ordering::Relaxed);
                }
            }
        }

        let frames_decoded = sampler.frames_read();
        let stop_reason = if cancelled {
            StopReason::Cancelled
        } else {
            sampler
                .stop_reason()
                .cloned()
                .map_or(StopReason::EndOfStream, StopReason::from)
        };

        writer
            .close()
            .map_err(|source| write_error(output, records_written, last_frame_index, source))?;

        self.logger.info(&format!(
            "Wrote {records_written} records to {}",
            output.display()
        ));
        let summary = RunSummary {
            records_written,
            last_frame_index,
            frames_decoded,
            stop_reason,
        };
        self.logger.finished(&summary);
        Ok(summary)
    }
}

fn write_error(
    output: &Path,
    records_written: u64,
    last_frame_index: Option<u64>,
    source: std::io::Error,
) -> PipelineError {
    PipelineError::Write {
        path: output.to_path_buf(),
        records_written,
        last_frame_index,
        source,
    }
}
