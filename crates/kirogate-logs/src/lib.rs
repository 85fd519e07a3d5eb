//! Request telemetry: one append-only SQLite row per dispatched request.

pub mod db;
pub mod sink;

pub use sink::{LogError, LogSink, RequestLogRow, SqliteLogSink};
