//! phd-persistence
//!
//! Implementaciones Postgres (Diesel + r2d2) de `FormProgressStore` y
//! `FormSubmissionStore`, más utilidades de conexión y migraciones.
//!
//! Módulos:
//! - `pg`: pool, proveedor de conexiones y los dos stores.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.
//! - `error`: clasificación de errores de Diesel.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, ConfigError, DbConfig};
pub use phd_core::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgFormProgressStore, PgFormSubmissionStore, PgPool,
             PoolProvider};
