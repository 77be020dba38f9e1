use thiserror::Error;

/// Errores de validación en los bordes (parsing de estados, fechas, etc.).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown submission status: {0}")]
    UnknownStatus(String),
    #[error("invalid timestamp '{0}' (expected RFC 3339)")]
    InvalidTimestamp(String),
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
}
