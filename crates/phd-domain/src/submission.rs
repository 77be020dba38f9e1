//! Envíos finales de formularios y su flujo de revisión.
//!
//! Ciclo de vida: `pending` al crearse; luego `approved`, `rejected` o
//! `deleted` (borrado lógico). Tras la creación sólo cambian el estado y los
//! campos de revisión.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;
use crate::user::UserId;

pub type SubmissionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
    Deleted,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 4] = [Self::Pending, Self::Approved, Self::Rejected, Self::Deleted];

    /// Valor persistido en la columna `status` (coincide con el CHECK de la
    /// tabla).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Deleted => "deleted",
        }
    }

    /// Transiciones válidas en modo estricto: `pending` puede ir a cualquier
    /// estado final y cualquier estado revisado puede borrarse. `deleted` es
    /// terminal.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        matches!((self, next),
                 (Self::Pending, Self::Approved)
                 | (Self::Pending, Self::Rejected)
                 | (Self::Pending, Self::Deleted)
                 | (Self::Approved, Self::Deleted)
                 | (Self::Rejected, Self::Deleted))
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "deleted" => Ok(Self::Deleted),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: SubmissionId,
    pub user_id: UserId,
    pub form_type: String,
    pub form_data: Value,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<UserId>,
    pub review_comments: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Envío unido a los datos del autor y, si existe, del revisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: FormSubmission,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub reviewer_first_name: Option<String>,
    pub reviewer_last_name: Option<String>,
}

/// Columnas por las que se permite ordenar listados.
///
/// Los nombres de columna no se pueden parametrizar como valores, así que
/// cualquier texto fuera de esta lista se ignora y se usa `SubmittedAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    SubmittedAt,
    Status,
    FormType,
    FirstName,
    LastName,
}

impl SortField {
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim() {
            "submitted_at" => Self::SubmittedAt,
            "status" => Self::Status,
            "form_type" => Self::FormType,
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            _ => Self::SubmittedAt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmittedAt => "submitted_at",
            Self::Status => "status",
            Self::FormType => "form_type",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` (sin importar mayúsculas) ordena ascendente; todo lo demás es
    /// `desc`.
    pub fn parse_or_default(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filtros de `user_submissions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSubmissionFilter {
    pub form_type: Option<String>,
    pub status: Option<SubmissionStatus>,
}

/// Filtros, búsqueda y orden de `all_submissions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionQuery {
    pub form_type: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl SubmissionQuery {
    /// Texto de búsqueda normalizado; una cadena vacía equivale a no buscar.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
