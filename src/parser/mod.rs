mod cleanup;
mod file_finder;
mod flatten;
mod parquet_writer;
mod xml_parser;

// Re-export public API
pub use cleanup::cleanup_chunks;
pub use file_finder::collect_xmls;
pub use flatten::{flatten_element, XmlElement};
pub use parquet_writer::write_records;
pub use xml_parser::RecordStream;
