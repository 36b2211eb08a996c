pub mod orchestrator;

pub use orchestrator::{compile_all, Journal, JournalError, JournalReport, DEFAULT_CONCURRENCY};
