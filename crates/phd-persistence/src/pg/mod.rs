//! Implementaciones Postgres (Diesel) de los stores de formularios.
//!
//! Objetivo general del módulo:
//! - Proveer una capa de persistencia durable con paridad 1:1 respecto al
//!   backend en memoria de `phd-core`.
//! - Cada llamada de store toma una conexión del pool, la usa y la devuelve
//!   (guard con alcance; se libera también en caminos de error).
//! - Sólo `create` (y los cambios de estado en modo estricto) abren una
//!   transacción explícita; el resto son sentencias sueltas.
//! - Sin reintentos: toda falla es terminal para la llamada y se reporta como
//!   `PersistenceError` con el nombre de la operación.

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, error, warn};
use phd_core::{PersistenceError, StoreFault, StoreOp};

use crate::error::DbError;
use crate::migrations::run_pending_migrations;

mod progress;
pub mod query;
pub mod rows;
mod submission;

pub use progress::PgFormProgressStore;
pub use submission::PgFormSubmissionStore;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// Notas operativas:
/// - El pool se construye con `min_idle` (mínimo de conexiones inactivas) y
///   `max_size` (límite superior total).
/// - Al construirlo, se corre automáticamente el set de migraciones pendientes
///   (una sola vez).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PooledPg = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Este trait permite:
/// - Inyectar un pool real (producción/tests de integración).
/// - Simular/factorear en tests unitarios sin acoplar a r2d2.
///
/// Contrato:
/// - Debe devolver una conexión válida o `StoreFault::TransientIo` en caso de
///   error.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Obtiene una conexión lista para ejecutar consultas Diesel.
    fn connection(&self) -> Result<PooledPg, StoreFault>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PooledPg, StoreFault> {
        self.pool
            .get()
            .map_err(|e| StoreFault::TransientIo(format!("pool error: {e}")))
    }
}

/// Ejecuta una unidad de trabajo con una conexión del proveedor.
///
/// La conexión vuelve al pool al salir del alcance, haya o no error. Las
/// fallas se envuelven en `PersistenceError` con la operación dada.
pub(crate) fn with_connection<P, T, F>(provider: &P, op: StoreOp, work: F) -> Result<T, PersistenceError>
    where P: ConnectionProvider,
          F: FnOnce(&mut PgConnection) -> Result<T, DbError>
{
    let mut conn = provider.connection().map_err(|fault| {
                                            error!("{op}: connection checkout failed: {fault}");
                                            PersistenceError::new(op, fault)
                                        })?;
    work(&mut *conn).map_err(|e| {
                       let fault = StoreFault::from(e);
                       match fault {
                           StoreFault::IllegalTransition { .. } => warn!("{op}: rejected: {fault}"),
                           _ => error!("{op}: {fault}"),
                       }
                       PersistenceError::new(op, fault)
                   })
}

/// Construye un pool Postgres r2d2 a partir de URL.
///
/// Comportamiento:
/// - Valida y ajusta tamaños (si `min_size > max_size`, usa `min_size =
///   max_size`).
/// - Ejecuta migraciones inmediatamente tras el primer `get()`.
/// - Devuelve `StoreFault::TransientIo` ante errores del pool/manager.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({} > {}), ajustando min=max", validated_min, validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| {
                                        PersistenceError::new(StoreOp::ConnectPool,
                                                              StoreFault::TransientIo(format!("pool build: {e}")))
                                    })?;
    // Ejecutar migraciones una sola vez al construir (primer connection checkout).
    {
        let mut conn = pool.get().map_err(|e| {
                                     PersistenceError::new(StoreOp::RunMigrations,
                                                           StoreFault::TransientIo(format!("pool get for migrations: {e}")))
                                 })?;
        run_pending_migrations(&mut conn)?;
    }
    debug!("pool ready min_idle={final_min} max_size={validated_max}");
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env().map_err(|e| {
                                                      PersistenceError::new(StoreOp::ConnectPool,
                                                                            StoreFault::Unknown(e.to_string()))
                                                  })?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
