pub mod delimited_log_reader;
pub mod delimited_log_writer;
