//! Traits de almacenamiento.
//!
//! Las operaciones que escriben toman `&mut self` y las lecturas `&self`. Cada
//! llamada es independiente: no hay orquestación entre ambos stores.
mod progress;
mod submission;

pub use progress::FormProgressStore;
pub use submission::FormSubmissionStore;

/// Paso inicial de un borrador recién guardado.
pub const DEFAULT_STEP: i32 = 0;
/// Ventana (en días) de la limpieza de borradores viejos.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
