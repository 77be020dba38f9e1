//! Clasificación de errores de Diesel / conexión en `StoreFault`.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use phd_core::StoreFault;

/// Error interno de una unidad de trabajo contra Postgres.
///
/// Permite usar `?` sobre llamadas Diesel y, a la vez, abortar una
/// transacción con una falla propia (p.ej. transición ilegal).
#[derive(Debug)]
pub enum DbError {
    Diesel(DieselError),
    Fault(StoreFault),
}

impl From<DieselError> for DbError {
    fn from(err: DieselError) -> Self {
        Self::Diesel(err)
    }
}

impl From<StoreFault> for DbError {
    fn from(fault: StoreFault) -> Self {
        Self::Fault(fault)
    }
}

impl From<DbError> for StoreFault {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Diesel(e) => classify(e),
            DbError::Fault(f) => f,
        }
    }
}

/// Mapea errores de Diesel a variantes semánticas.
pub fn classify(err: DieselError) -> StoreFault {
    match err {
        DieselError::NotFound => StoreFault::Unknown("query returned no rows".into()),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => StoreFault::UniqueViolation(info.message().to_string()),
            DatabaseErrorKind::CheckViolation => StoreFault::CheckViolation(info.message().to_string()),
            DatabaseErrorKind::ForeignKeyViolation => StoreFault::ForeignKeyViolation(info.message().to_string()),
            DatabaseErrorKind::SerializationFailure => StoreFault::SerializationConflict,
            DatabaseErrorKind::ClosedConnection => StoreFault::TransientIo(info.message().to_string()),
            other => StoreFault::Unknown(format!("db error kind {:?}: {}", other, info.message())),
        },
        DieselError::DeserializationError(e) => StoreFault::Corrupt(format!("deser: {e}")),
        DieselError::SerializationError(e) => StoreFault::Unknown(format!("ser: {e}")),
        DieselError::RollbackErrorOnCommit { rollback_error, commit_error } => {
            StoreFault::Unknown(format!("rollback={rollback_error}; commit={commit_error}"))
        }
        DieselError::BrokenTransactionManager => StoreFault::TransientIo("broken transaction manager".into()),
        DieselError::QueryBuilderError(e) => StoreFault::Unknown(format!("query builder: {e}")),
        other => StoreFault::Unknown(format!("unhandled diesel error: {other:?}")),
    }
}
