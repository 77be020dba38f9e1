//! Borradores de formularios (progreso no enviado).
//!
//! Un único registro por par (usuario, tipo de formulario). `form_data` es
//! opaco: su forma la define el frontend y aquí no se valida.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::user::UserId;

pub type ProgressId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormProgress {
    pub id: ProgressId,
    pub user_id: UserId,
    pub form_type: String,
    pub form_data: Value,
    pub step_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fila reducida para listar los borradores de un usuario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub form_type: String,
    pub step_number: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<&FormProgress> for ProgressSummary {
    fn from(p: &FormProgress) -> Self {
        Self { form_type: p.form_type.clone(),
               step_number: p.step_number,
               updated_at: p.updated_at }
    }
}

/// Agregado por tipo de formulario para reportes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStat {
    pub form_type: String,
    pub total_progress: i64,
    pub average_step: f64,
    pub max_step: i32,
}

/// Borrador junto a los datos de contacto de su dueño.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressWithUser {
    #[serde(flatten)]
    pub progress: FormProgress,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}
