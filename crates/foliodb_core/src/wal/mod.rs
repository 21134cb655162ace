//! Write-ahead log: entry types and the per-entry file writer.

mod entry;
mod writer;

pub use entry::{LogEntry, Operation};
pub use writer::WalWriter;
