//! phd-core: contratos de persistencia de formularios.
//!
//! - `store`: traits `FormProgressStore` y `FormSubmissionStore`.
//! - `errors`: `PersistenceError` (único tipo de error visible para el
//!   llamador) y su clasificación interna `StoreFault`.
//! - `policy`: chequeo configurable de transiciones de estado.
//! - `memory`: backend en memoria con la misma semántica que Postgres (tests,
//!   prototipos, CLI sin base de datos).
pub mod errors;
pub mod memory;
pub mod policy;
pub mod store;

pub use errors::{PersistenceError, StoreFault, StoreOp};
pub use memory::InMemoryForms;
pub use policy::TransitionPolicy;
pub use store::{FormProgressStore, FormSubmissionStore, DEFAULT_RETENTION_DAYS, DEFAULT_STEP};
