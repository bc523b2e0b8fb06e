//! sal-results: stage result tables, absolute timelines and the run store.

pub mod hash;
pub mod store;
pub mod table;
pub mod timeline;
pub mod types;

pub use hash::compute_run_id;
pub use store::RunStore;
pub use table::ResultTable;
pub use timeline::{PondTimeline, TimelineRow, absolute_days};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("Table {table}: none of the columns {candidates:?} found and fallback index {fallback:?} is out of range")]
    MissingColumn {
        table: String,
        candidates: Vec<String>,
        fallback: Option<usize>,
    },

    #[error("Table {table} line {line}: {message}")]
    Parse {
        table: String,
        line: usize,
        message: String,
    },

    #[error("Table {table} has no data rows")]
    EmptyTable { table: String },

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
