/// Frame rate assumed when the decoder cannot report one.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Cadence used when neither a time nor a frame interval is configured
/// (about one sample per second at 30 fps).
pub const DEFAULT_INTERVAL_FRAMES: u64 = 30;

/// Fraction of frame height treated as overlay zone at top and bottom.
pub const DEFAULT_ZONE_RATIO: f64 = 0.25;

/// Ratio substituted for a non-positive or non-finite zone ratio.
pub const MIN_ZONE_RATIO: f64 = 0.01;

/// Largest zone ratio accepted; the two zones meet in the middle.
pub const MAX_ZONE_RATIO: f64 = 0.5;

/// Line preceding every block of the persisted detection log.
pub const BLOCK_DELIMITER: &str = "=============";

/// Suffix appended to the input file stem for the default output path.
pub const DETECTIONS_SUFFIX: &str = "_detections.txt";
