use chrono::{DateTime, Utc};
use phd_domain::{FormProgress, ProgressStat, ProgressSummary, ProgressWithUser, UserId};
use serde_json::Value;

use crate::errors::PersistenceError;

/// Borradores de formularios, uno por (usuario, tipo de formulario).
pub trait FormProgressStore {
    /// Inserta o reemplaza el borrador; siempre refresca `updated_at`.
    fn save_progress(&mut self,
                     user_id: UserId,
                     form_type: &str,
                     form_data: &Value,
                     step_number: i32)
                     -> Result<FormProgress, PersistenceError>;

    fn load_progress(&self, user_id: UserId, form_type: &str) -> Result<Option<FormProgress>, PersistenceError>;

    /// Idempotente: devuelve `true` aunque no existiera el borrador.
    fn clear_progress(&mut self, user_id: UserId, form_type: &str) -> Result<bool, PersistenceError>;

    /// Borradores del usuario, el más reciente primero.
    fn user_progress(&self, user_id: UserId) -> Result<Vec<ProgressSummary>, PersistenceError>;

    fn has_progress(&self, user_id: UserId, form_type: &str) -> Result<bool, PersistenceError>;

    /// Sólo cambia `step_number` y `updated_at`; no crea filas.
    fn update_step(&mut self,
                   user_id: UserId,
                   form_type: &str,
                   step_number: i32)
                   -> Result<Option<FormProgress>, PersistenceError>;

    /// Agregado por tipo de formulario, ordenado por total descendente.
    fn progress_stats(&self) -> Result<Vec<ProgressStat>, PersistenceError>;

    /// Borradores con `updated_at` en `[start, end]`, con datos del dueño.
    fn progress_by_date_range(&self,
                              start: DateTime<Utc>,
                              end: DateTime<Utc>)
                              -> Result<Vec<ProgressWithUser>, PersistenceError>;

    /// Borra borradores más viejos que `days` de usuarios sin envíos en esa
    /// misma ventana. Devuelve cuántas filas se borraron.
    fn cleanup_old_progress(&mut self, days: u32) -> Result<u64, PersistenceError>;
}
