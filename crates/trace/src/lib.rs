//! Trace event model for agent session logs.
//!
//! Normalizes heterogeneous session JSONL rows into typed trace events:
//! a safe accessor layer over raw rows, a total classifier that never fails,
//! a streaming session importer, and line-delimited JSON read/write helpers.

pub mod adapter;
pub mod classify;
pub mod io;
pub mod raw;
pub mod schema;

pub use adapter::{import_session, ImportOptions, Profile};
pub use classify::{classify_row, Classified};
pub use io::{read_events, read_rows, write_rows, JsonlWriter};
pub use raw::{as_text, tool_call_names, RawRow};
pub use schema::{new_event_id, new_run_id, Event, EventKind, RunMeta, EVENT_SCHEMA, RUN_SCHEMA};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
