//! Formas de los reportes agregados sobre envíos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Ventana opcional de análisis (inclusiva en ambos extremos, sobre
/// `submitted_at`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsFilter {
    pub form_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl AnalyticsFilter {
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(DomainError::InvalidRange { start: start.to_rfc3339(),
                                                                                         end: end.to_rfc3339() }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub deleted: i64,
    /// Media de `reviewed_at - submitted_at` en horas, sólo sobre filas
    /// revisadas. `None` si ninguna fila fue revisada.
    pub avg_review_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTypeStats {
    pub form_type: String,
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Conteo por mes calendario (`YYYY-MM`, UTC). Solo los 12 meses que terminan
/// en el mes actual; meses sin envíos no aparecen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: String,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAnalytics {
    pub overall: OverallStats,
    pub by_form_type: Vec<FormTypeStats>,
    /// Más reciente primero.
    pub by_month: Vec<MonthlyCount>,
}

/// Conteos de ventana móvil para el panel de revisores (excluye borrados).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub today: i64,
    pub this_week: i64,
    pub this_month: i64,
}
