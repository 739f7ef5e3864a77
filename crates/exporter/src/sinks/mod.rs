//! Sink implementations
//!
//! Contains FileSink and LogSink.

mod file;
mod log;

pub use self::file::FileSink;
pub use self::log::LogSink;
