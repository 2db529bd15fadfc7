use thiserror::Error;

/// Malformed input. Raised before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Unknown payment frequency '{0}'")]
    UnknownFrequency(String),

    #[error("Unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error(
        "Transaction type '{transaction_type}' does not match type '{category_type}' of category {category_id}"
    )]
    CategoryTypeMismatch {
        category_id: i32,
        category_type: String,
        transaction_type: String,
    },

    #[error("Invalid period {year}-{month}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("Amount overflow while computing {0}")]
    AmountOverflow(&'static str),
}

/// The operation is valid in general but not against the current state of the record.
/// Callers re-fetch and choose a different operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateConflict {
    #[error("Installment {installment_id} is already paid")]
    AlreadyPaid { installment_id: i32 },

    #[error("Transaction {transaction_id} is already {status}")]
    AlreadyFinalized { transaction_id: i32, status: String },

    #[error(
        "Schedule of agreement {agreement_id} is locked: {paid_installments} installment(s) already paid"
    )]
    ScheduleLocked {
        agreement_id: i32,
        paid_installments: u64,
    },

    #[error("Agreement {agreement_id} is {status} and can no longer be edited")]
    AgreementNotActive { agreement_id: i32, status: String },

    #[error("{entity} {id} was modified concurrently")]
    ConcurrentModification { entity: &'static str, id: i32 },

    #[error("A category named '{name}' already exists")]
    DuplicateCategory { name: String },
}

/// Error types for the billing engine
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("State conflict: {0}")]
    Conflict(#[from] StateConflict),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },
}

impl ComputeError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        ComputeError::NotFound { entity, id }
    }

    /// Stable machine readable code, surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            ComputeError::Database(_) => "DATABASE_ERROR",
            ComputeError::NotFound { .. } => "NOT_FOUND",
            ComputeError::Validation(v) => match v {
                ValidationError::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
                ValidationError::InvalidSchedule(_) => "INVALID_SCHEDULE",
                ValidationError::UnknownFrequency(_) => "UNKNOWN_FREQUENCY",
                ValidationError::UnknownValue { .. } => "UNKNOWN_VALUE",
                ValidationError::CategoryTypeMismatch { .. } => "CATEGORY_TYPE_MISMATCH",
                ValidationError::InvalidPeriod { .. } => "INVALID_PERIOD",
                ValidationError::AmountOverflow(_) => "AMOUNT_OVERFLOW",
            },
            ComputeError::Conflict(c) => match c {
                StateConflict::AlreadyPaid { .. } => "ALREADY_PAID",
                StateConflict::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
                StateConflict::ScheduleLocked { .. } => "SCHEDULE_LOCKED",
                StateConflict::AgreementNotActive { .. } => "AGREEMENT_NOT_ACTIVE",
                StateConflict::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
                StateConflict::DuplicateCategory { .. } => "DUPLICATE_CATEGORY",
            },
        }
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
