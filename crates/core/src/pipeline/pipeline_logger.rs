use std::collections::BTreeMap;
use std::time::Instant;

use super::extract_text_use_case::{RunSummary, StopReason};

/// Observer for an extraction run.
///
/// The use case reports through this trait instead of logging directly,
/// so the CLI can print a run report and tests can stay silent. Stage
/// names are `decode`, `propose`, `recognize` and `write`; metrics are
/// `texts_per_frame` and `regions_per_frame`.
pub trait PipelineLogger: Send {
    /// Called after each record is written. `expected` is 0 when the
    /// number of samples is not known ahead of time.
    fn progress(&mut self, sampled: usize, expected: usize);

    /// Time spent in one stage for one frame or crop.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn metric(&mut self, name: &str, value: f64);

    /// Run-level status line (input opened, window resolved, cancelled...).
    fn info(&mut self, message: &str);

    /// Called once when a run ends without a fatal error.
    fn finished(&mut self, _summary: &RunSummary) {}

    /// Emit the end-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _sampled: usize, _expected: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and number of zero observations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Series {
    count: usize,
    total: f64,
    zeros: usize,
}

impl Series {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        if value == 0.0 {
            self.zeros += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// CLI logger: forwards status lines to `log`, prints progress every
/// `progress_every` records and builds an extraction report at the end.
pub struct StdoutPipelineLogger {
    progress_every: usize,
    started: Instant,
    sampled: usize,
    stages: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    run: Option<RunSummary>,
}

impl StdoutPipelineLogger {
    pub fn new(progress_every: usize) -> Self {
        Self {
            progress_every: progress_every.max(1),
            started: Instant::now(),
            sampled: 0,
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
            run: None,
        }
    }

    /// The end-of-run report, or `None` before anything was sampled.
    pub fn summary_string(&self) -> Option<String> {
        if self.sampled == 0 && self.run.is_none() {
            return None;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!("Extraction summary ({elapsed:.1}s):")];

        if let Some(run) = &self.run {
            let last = run
                .last_frame_index
                .map_or_else(|| "none".to_string(), |i| format!("frame {i}"));
            lines.push(format!(
                "  records written : {} (last {last})",
                run.records_written
            ));
            lines.push(format!(
                "  frames decoded  : {} for {} sampled",
                run.frames_decoded, run.records_written
            ));
            lines.push(format!("  stopped         : {}", describe_stop(&run.stop_reason)));
        }

        if let Some(texts) = self.metrics.get("texts_per_frame") {
            let pct = if texts.count > 0 {
                texts.zeros as f64 / texts.count as f64 * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  empty records   : {}/{} ({pct:.0}%)",
                texts.zeros, texts.count
            ));
            lines.push(format!("  texts per record: {:.1}", texts.mean()));
        }
        if let Some(regions) = self.metrics.get("regions_per_frame") {
            lines.push(format!("  regions per frame: {:.1}", regions.mean()));
        }

        for (stage, series) in &self.stages {
            lines.push(format!(
                "  {stage:<9} {:6.1}ms avg over {} calls",
                series.mean(),
                series.count
            ));
        }

        if self.sampled > 0 && elapsed > 0.0 {
            lines.push(format!(
                "  throughput      : {:.1} sampled frames/s",
                self.sampled as f64 / elapsed
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, sampled: usize, expected: usize) {
        self.sampled = sampled;
        if sampled % self.progress_every != 0 && sampled != expected {
            return;
        }
        if expected > 0 {
            log::info!("Sampled {sampled}/{expected} frames");
        } else {
            log::info!("Sampled {sampled} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn finished(&mut self, summary: &RunSummary) {
        self.run = Some(summary.clone());
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn describe_stop(reason: &StopReason) -> String {
    match reason {
        StopReason::EndOfStream => "end of stream".to_string(),
        StopReason::WindowEnd => "end time reached".to_string(),
        StopReason::DecodeFailed(reason) => format!("decode failed ({reason})"),
        StopReason::Cancelled => "cancelled".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(records_written: u64, frames_decoded: u64, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            records_written,
            last_frame_index: records_written.checked_sub(1).map(|n| n * 30),
            frames_decoded,
            stop_reason,
        }
    }

    #[test]
    fn test_series_tracks_mean_and_zeros() {
        let mut s = Series::default();
        for v in [0.0, 2.0, 0.0, 4.0] {
            s.push(v);
        }
        assert_eq!(s.count, 4);
        assert_eq!(s.zeros, 2);
        assert!((s.mean() - 1.5).abs() < f64::EPSILON);
        assert_eq!(Series::default().mean(), 0.0);
    }

    #[test]
    fn test_empty_logger_has_no_summary() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_summary_reports_run_and_empty_rate() {
        let mut logger = StdoutPipelineLogger::new(10);
        for (i, texts) in [2.0, 0.0, 2.0, 0.0].into_iter().enumerate() {
            logger.metric("texts_per_frame", texts);
            logger.timing("recognize", 4.0);
            logger.progress(i + 1, 4);
        }
        logger.finished(&run(4, 91, StopReason::WindowEnd));

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("records written : 4 (last frame 90)"), "{summary}");
        assert!(summary.contains("frames decoded  : 91 for 4 sampled"), "{summary}");
        assert!(summary.contains("stopped         : end time reached"), "{summary}");
        assert!(summary.contains("empty records   : 2/4 (50%)"), "{summary}");
        assert!(summary.contains("texts per record: 1.0"), "{summary}");
        assert!(summary.contains("recognize"), "{summary}");
        assert!(summary.contains("over 4 calls"), "{summary}");
    }

    #[test]
    fn test_summary_after_run_with_no_records() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.finished(&run(0, 0, StopReason::Cancelled));

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("records written : 0 (last none)"), "{summary}");
        assert!(summary.contains("cancelled"), "{summary}");
        assert!(!summary.contains("throughput"), "{summary}");
    }

    #[test]
    fn test_summary_names_decode_failure() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(1, 0);
        logger.finished(&run(1, 40, StopReason::DecodeFailed("corrupt".to_string())));
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("decode failed (corrupt)"), "{summary}");
    }

    #[test]
    fn test_progress_counts_with_unknown_total() {
        let mut logger = StdoutPipelineLogger::new(4);
        for i in 1..=7 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.sampled, 7);
    }

    #[test]
    fn test_stages_are_reported_in_name_order() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(1, 1);
        logger.timing("write", 1.0);
        logger.timing("decode", 2.0);
        logger.timing("recognize", 3.0);

        let summary = logger.summary_string().unwrap();
        let pos = |s: &str| summary.find(s).unwrap();
        assert!(pos("decode") < pos("recognize"));
        assert!(pos("recognize") < pos("write"));
    }

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("propose", 5.0);
        logger.metric("regions_per_frame", 3.0);
        logger.info("hello");
        logger.finished(&run(1, 1, StopReason::EndOfStream));
        logger.summary();
    }

    #[test]
    fn test_zero_progress_interval_is_clamped() {
        assert_eq!(StdoutPipelineLogger::new(0).progress_every, 1);
        assert_eq!(StdoutPipelineLogger::default().progress_every, 10);
    }
}
