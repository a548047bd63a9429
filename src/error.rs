use thiserror::Error;

/// Failures surfaced by planning, execution and the inventory boundary.
///
/// Expected conditions (nothing to plan against, nothing fits, stale roll) are
/// ordinary values of this type; only misconfigured constraints panic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid {field}: {value} (must be a finite number greater than zero)")]
    InvalidInput { field: &'static str, value: f64 },

    #[error("no candidate roll available for planning")]
    NoCandidateRoll,

    #[error("no pending order fits roll {roll_id} (usable width {usable_width}mm)")]
    NoFeasiblePlan { roll_id: String, usable_width: f64 },

    #[error("roll {roll_id} was consumed or changed since planning; the plan is stale")]
    ExecutionConflict { roll_id: String },

    #[error("plan for roll {roll_id} does not fit the roll: {reason}")]
    InconsistentPlan { roll_id: String, reason: String },

    #[error("a record with id {0} already exists")]
    DuplicateId(String),

    #[error("failed to persist '{key}': {reason}")]
    PersistenceFailure { key: String, reason: String },

    #[error("roll {0} not found")]
    RollNotFound(String),

    #[error("order {0} not found")]
    OrderNotFound(String),
}

impl PlanError {
    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::InvalidInput { .. } => "INVALID_INPUT",
            PlanError::NoCandidateRoll => "NO_CANDIDATE_ROLL",
            PlanError::NoFeasiblePlan { .. } => "NO_FEASIBLE_PLAN",
            PlanError::ExecutionConflict { .. } => "EXECUTION_CONFLICT",
            PlanError::InconsistentPlan { .. } => "INCONSISTENT_PLAN",
            PlanError::DuplicateId(_) => "DUPLICATE_ID",
            PlanError::PersistenceFailure { .. } => "PERSISTENCE_FAILURE",
            PlanError::RollNotFound(_) => "ROLL_NOT_FOUND",
            PlanError::OrderNotFound(_) => "ORDER_NOT_FOUND",
        }
    }
}
