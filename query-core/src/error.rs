use crate::ExecutorError;
use query_structure::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Query complexity exceeds the maximum allowed of {max}")]
    ComplexityExceeded { max: usize },

    #[error("Field `{name}` does not exist on entity `{entity}`")]
    UnknownField { name: String, entity: String },

    #[error("{0}")]
    InvalidPaginationArg(#[from] PaginationError),

    #[error("Error in domain logic: {0}")]
    Domain(#[from] DomainError),

    #[error("Error in executor: {0}")]
    Executor(#[from] ExecutorError),

    /// Unexpected planner state. Depending on settings this either
    /// surfaces or downgrades to skipping the optimization.
    #[error("Planner internal error: {message}")]
    PlannerInternal { message: String },
}

impl CoreError {
    pub fn internal(message: impl Into<String>) -> Self {
        CoreError::PlannerInternal {
            message: message.into(),
        }
    }
}

/// Pagination argument failures, with their canonical client-facing
/// messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("You must provide a `first` or `last` for pagination.")]
    MissingFirstOrLast,

    #[error("Argument 'first' must be a positive integer.")]
    FirstNotPositive,

    #[error("Argument 'last' must be a positive integer.")]
    LastNotPositive,

    #[error("Requesting first {first} records exceeds the limit of {max}.")]
    FirstExceedsMax { first: i64, max: u64 },

    #[error("Requesting last {last} records exceeds the limit of {max}.")]
    LastExceedsMax { last: i64, max: u64 },

    #[error("Argument `offset` must be a positive integer.")]
    OffsetNotPositive,

    #[error("The node pointed with `after` does not exist.")]
    AfterNotFound,

    #[error("The node pointed with `before` does not exist.")]
    BeforeNotFound,

    #[error("The node pointed with `after` must be before the node pointed with `before`.")]
    AfterBeforeInverted,

    #[error("Can only use either `offset` or `before`/`after` for pagination.")]
    OffsetWithCursor,
}

pub type CoreResult<T> = Result<T, CoreError>;
