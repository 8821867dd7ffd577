//! Error types
//!
//! Every `PlanError` is a configuration error raised while a plan is being
//! built, never while it is evaluated. `SessionError` belongs to the
//! reference evaluator.

use thiserror::Error;

/// Largest tuple degree an expression may carry.
pub const MAX_DEGREE: usize = 4;

/// Plan construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A `None` joiner combined with any other joiner
    #[error("If present, the none joiner must be the only joiner, got {joiners} instead (none joiner at #{position}).")]
    NoneJoinerNotAlone { position: usize, joiners: String },

    /// An indexing joiner after a filtering joiner
    #[error("Indexing joiner #{position} ({joiner}) must not follow a filtering joiner #{filter_position} ({filter}) in {joiners}.")]
    IndexingAfterFiltering {
        position: usize,
        joiner: String,
        filter_position: usize,
        filter: String,
        joiners: String,
    },

    /// Requested outputs exceed the supported degree
    #[error("{operation} would produce {requested} outputs, more than the maximum degree of {maximum}")]
    DegreeOverflow {
        operation: &'static str,
        requested: usize,
        maximum: usize,
    },

    /// Grouping without key mappings and without collectors
    #[error("groupBy needs at least one key mapping or collector")]
    EmptyGroupBy,

    /// The right operand of a join carries more than one value
    #[error("join operand must have degree 1, got degree {degree}")]
    JoinOperandDegree { degree: usize },

    /// Both join operands bind the same variable
    #[error("join operand rebinds variable '{variable}' already bound on the left; build the right side with its own for_each")]
    SharedJoinVariable { variable: String },

    /// A condition reads a variable that no earlier condition binds
    #[error("condition #{condition} reads variable '{variable}' before it is bound")]
    UnboundVariable { variable: String, condition: usize },
}

/// Result type for plan construction
pub type PlanResult<T> = Result<T, PlanError>;

/// Reference evaluator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Fact handle not known to the session
    #[error("Unknown fact handle: {0}")]
    UnknownFact(u64),

    /// Too many intermediate bindings
    #[error("Evaluation exceeded the limit of {limit} bindings")]
    BindingLimitExceeded { limit: usize },

    /// A condition read a variable with no value in the current binding
    #[error("Variable '{0}' is not bound")]
    UnboundVariable(String),
}

/// Result type for reference evaluation
pub type SessionResult<T> = Result<T, SessionError>;
