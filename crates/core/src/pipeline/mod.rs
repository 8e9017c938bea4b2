pub mod detection_aggregator;
pub mod extract_text_use_case;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod region_filter;
