pub mod file_sink;
pub mod memory_handler;
pub mod null_handler;
