use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use scoreline_core::detection::domain::text_recognizer::TextRecognizer;
use scoreline_core::detection::domain::zone_policy::ZonePolicy;
use scoreline_core::detection::infrastructure::onnx_ctc_recognizer::OnnxCtcRecognizer;
use scoreline_core::detection::infrastructure::onnx_text_region_proposer::{
    OnnxTextRegionProposer, DEFAULT_CONFIDENCE,
};
use scoreline_core::pipeline::detection_aggregator::{DetectionAggregator, RegionStrategy};
use scoreline_core::pipeline::extract_text_use_case::{ExtractTextUseCase, StopReason};
use scoreline_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use scoreline_core::sampling::sample_window::SamplingConfig;
use scoreline_core::shared::constants::{
    DEFAULT_INTERVAL_FRAMES, DEFAULT_ZONE_RATIO, DETECTIONS_SUFFIX, MAX_ZONE_RATIO,
};
use scoreline_core::storage::infrastructure::delimited_log_writer::DelimitedLogWriter;
use scoreline_core::video::domain::video_reader::VideoReader;
use scoreline_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use scoreline_core::video::infrastructure::prefetch_reader::PrefetchReader;

/// Read scoreboard and caption text from sampled frames of a recorded video.
#[derive(Parser)]
#[command(name = "scoreline")]
struct Cli {
    /// Input video file.
    video: PathBuf,

    /// Output log (default: <video stem>_detections.txt beside the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sample one frame every N seconds (overrides --interval-frames).
    #[arg(long)]
    interval_sec: Option<f64>,

    /// Sample one frame every N frames.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_FRAMES)]
    interval_frames: u64,

    /// Start time in seconds.
    #[arg(long, default_value = "0.0")]
    start: f64,

    /// End time in seconds (default: end of video).
    #[arg(long)]
    end: Option<f64>,

    /// ONNX text detection model. Required unless --whole-frame is given.
    #[arg(long, conflicts_with = "whole_frame")]
    region_model: Option<PathBuf>,

    /// Skip text detection and run the recognizer on whole frames. The
    /// recognizer reads a single text line, so this only suits videos
    /// already cropped to one overlay line.
    #[arg(long)]
    whole_frame: bool,

    /// Text region confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Fraction of frame height kept at the top and bottom (0.0-0.5].
    #[arg(long, default_value_t = DEFAULT_ZONE_RATIO)]
    zone_ratio: f64,

    /// Keep text regions anywhere in the frame.
    #[arg(long)]
    no_zone_filter: bool,

    /// ONNX text recognition model.
    #[arg(long)]
    recognizer_model: PathBuf,

    /// Recognizer charset file, one symbol per line.
    #[arg(long)]
    charset: PathBuf,

    /// Frames to decode ahead on a background thread (0 = off).
    #[arg(long, default_value = "0")]
    prefetch: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.video));
    let recognizer = build_recognizer(&cli)?;
    let strategy = build_strategy(&cli)?;
    let reader = build_reader(cli.prefetch);

    let sampling = SamplingConfig {
        interval_seconds: cli.interval_sec,
        interval_frames: cli.interval_frames,
        start_time_seconds: cli.start,
        end_time_seconds: cli.end,
    };

    let mut use_case = ExtractTextUseCase::new(
        reader,
        DetectionAggregator::new(recognizer, strategy),
        Box::new(DelimitedLogWriter::new()),
        Box::new(StdoutPipelineLogger::new(10)),
        sampling,
        None,
        None,
    );

    let summary = match use_case.execute(&cli.video, &output) {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(index) = e.last_frame_index() {
                eprintln!("Last complete frame: {index} (resume with --start past it)");
            }
            return Err(e.into());
        }
    };
    use_case.logger().summary();

    if let StopReason::DecodeFailed(reason) = &summary.stop_reason {
        log::warn!("Decoding stopped early: {reason}");
    }
    log::info!(
        "{} records written to {}",
        summary.records_written,
        output.display()
    );
    Ok(())
}

fn build_recognizer(cli: &Cli) -> Result<Box<dyn TextRecognizer>, Box<dyn std::error::Error>> {
    log::info!("Loading recognizer: {}", cli.recognizer_model.display());
    Ok(Box::new(OnnxCtcRecognizer::new(
        &cli.recognizer_model,
        &cli.charset,
    )?))
}

fn build_strategy(cli: &Cli) -> Result<RegionStrategy, Box<dyn std::error::Error>> {
    let Some(model) = &cli.region_model else {
        log::warn!("No text detector: recognizing whole frames as a single line");
        return Ok(RegionStrategy::WholeFrame);
    };
    log::info!("Loading text detector: {}", model.display());
    let proposer = OnnxTextRegionProposer::new(model, cli.confidence)?;
    let zone = if cli.no_zone_filter {
        ZonePolicy::disabled()
    } else {
        ZonePolicy::new(true, cli.zone_ratio)
    };
    Ok(RegionStrategy::Proposed {
        proposer: Box::new(proposer),
        zone,
    })
}

fn build_reader(prefetch: usize) -> Box<dyn VideoReader> {
    let reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    if prefetch > 0 {
        Box::new(PrefetchReader::new(reader, prefetch))
    } else {
        reader
    }
}

fn default_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video.with_file_name(format!("{stem}{DETECTIONS_SUFFIX}"))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.region_model.is_none() && !cli.whole_frame {
        return Err("Either --region-model or --whole-frame is required".into());
    }
    if !cli.video.exists() {
        return Err(format!("Input file not found: {}", cli.video.display()).into());
    }
    if !cli.recognizer_model.exists() {
        return Err(format!(
            "Recognizer model not found: {}",
            cli.recognizer_model.display()
        )
        .into());
    }
    if !cli.charset.exists() {
        return Err(format!("Charset file not found: {}", cli.charset.display()).into());
    }
    if let Some(model) = &cli.region_model {
        if !model.exists() {
            return Err(format!("Region model not found: {}", model.display()).into());
        }
    }
    if let Some(interval) = cli.interval_sec {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(format!("Interval must be positive, got {interval}").into());
        }
    }
    if cli.interval_frames == 0 {
        return Err("Frame interval must be at least 1".into());
    }
    if !(cli.start.is_finite() && cli.start >= 0.0) {
        return Err(format!("Start time must be non-negative, got {}", cli.start).into());
    }
    if let Some(end) = cli.end {
        if !(end.is_finite() && end > cli.start) {
            return Err(format!(
                "End time must be after start time ({}), got {end}",
                cli.start
            )
            .into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(cli.zone_ratio > 0.0 && cli.zone_ratio <= MAX_ZONE_RATIO) {
        return Err(format!(
            "Zone ratio must be in (0.0, {MAX_ZONE_RATIO}], got {}",
            cli.zone_ratio
        )
        .into());
    }
    Ok(())
}
