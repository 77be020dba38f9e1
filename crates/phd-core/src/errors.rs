//! Errores de persistencia.
//!
//! Todo fallo se entrega como `PersistenceError` con el nombre de la
//! operación: `"Failed to save form progress: <causa>"`. La causa conserva una
//! clasificación (`StoreFault`) para diagnóstico, pero el llamador no está
//! obligado a distinguirla. La ausencia de filas nunca es un error.

use std::fmt;

use phd_domain::SubmissionStatus;
use thiserror::Error;

/// Operación de store que falló (frase usada en el mensaje de error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    ConnectPool,
    RunMigrations,
    SaveProgress,
    LoadProgress,
    ClearProgress,
    UserProgress,
    HasProgress,
    UpdateStep,
    ProgressStats,
    ProgressByDateRange,
    CleanupProgress,
    CreateSubmission,
    FindSubmission,
    UserSubmissions,
    AllSubmissions,
    PendingSubmissions,
    UpdateStatus,
    DeleteSubmission,
    Analytics,
    DashboardStats,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectPool => "connect to database",
            Self::RunMigrations => "run migrations",
            Self::SaveProgress => "save form progress",
            Self::LoadProgress => "load form progress",
            Self::ClearProgress => "clear form progress",
            Self::UserProgress => "get user progress",
            Self::HasProgress => "check form progress",
            Self::UpdateStep => "update progress step",
            Self::ProgressStats => "get progress stats",
            Self::ProgressByDateRange => "get progress by date range",
            Self::CleanupProgress => "cleanup old progress",
            Self::CreateSubmission => "create form submission",
            Self::FindSubmission => "find form submission",
            Self::UserSubmissions => "get user submissions",
            Self::AllSubmissions => "get all submissions",
            Self::PendingSubmissions => "get pending submissions",
            Self::UpdateStatus => "update submission status",
            Self::DeleteSubmission => "delete form submission",
            Self::Analytics => "get submission analytics",
            Self::DashboardStats => "get dashboard stats",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreFault {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("serialization conflict")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition { from: SubmissionStatus, to: SubmissionStatus },
    #[error("unknown database error: {0}")]
    Unknown(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Failed to {operation}: {cause}")]
pub struct PersistenceError {
    pub operation: StoreOp,
    #[source]
    pub cause: StoreFault,
}

impl PersistenceError {
    pub fn new(operation: StoreOp, cause: StoreFault) -> Self {
        Self { operation, cause }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_operation() {
        let err = PersistenceError::new(StoreOp::SaveProgress, StoreFault::TransientIo("pool timed out".into()));
        assert_eq!(err.to_string(),
                   "Failed to save form progress: transient IO / connection pool error: pool timed out");
    }

    #[test]
    fn illegal_transition_renders_both_states() {
        let err = PersistenceError::new(StoreOp::UpdateStatus,
                                        StoreFault::IllegalTransition { from: SubmissionStatus::Approved,
                                                                        to: SubmissionStatus::Rejected });
        assert_eq!(err.to_string(), "Failed to update submission status: illegal status transition approved -> rejected");
    }
}
