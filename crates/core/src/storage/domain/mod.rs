pub mod detection_record;
pub mod record_writer;
