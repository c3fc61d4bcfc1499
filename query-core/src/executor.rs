use query_structure::{QuerySet, Record};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExecutorError {
    pub message: String,
}

impl ExecutorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The driver seam. The planner never talks to a database itself; the
/// single-entity fast path hands the rewritten queryset to this trait.
pub trait Executor {
    fn find_one(&mut self, queryset: &QuerySet) -> Result<Option<Record>, ExecutorError>;
}
