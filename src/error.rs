use thiserror::Error;

/// Error kinds surfaced to HTTP clients and the audit log.
///
/// Classification rule: anything a retry could plausibly fix (transient
/// store or feed failure) is `StoreError`/`QuoteUnavailable`; anything a
/// different input would fix is one of the input-shaped kinds below.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("insufficient shares")]
    InsufficientShares,

    #[error("no reservation")]
    NoReservation,

    #[error("no trigger")]
    NoTrigger,

    #[error("duplicate trigger")]
    DuplicateTrigger,

    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("store error: {0}")]
    StoreError(String),
}

impl AppError {
    /// Machine-readable code used in both the JSON error body and audit events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::UnknownUser(_) => "UnknownUser",
            AppError::InsufficientFunds => "InsufficientFunds",
            AppError::InsufficientShares => "InsufficientShares",
            AppError::NoReservation => "NoReservation",
            AppError::NoTrigger => "NoTrigger",
            AppError::DuplicateTrigger => "DuplicateTrigger",
            AppError::QuoteUnavailable(_) => "QuoteUnavailable",
            AppError::StoreError(_) => "StoreError",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::StoreError(e.to_string())
    }
}
