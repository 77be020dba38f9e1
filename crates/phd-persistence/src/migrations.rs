//! Wrapper para correr migraciones embebidas.
//!
//! Las migraciones viven en `migrations/` de este crate y sólo crean tablas
//! con `IF NOT EXISTS`, así que son inocuas contra el esquema existente. Al
//! construir el pool se ejecutan una vez.

use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;
use phd_core::{PersistenceError, StoreFault, StoreOp};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn run_pending_migrations(conn: &mut PgConnection) -> Result<(), PersistenceError> {
    let applied = conn.run_pending_migrations(MIGRATIONS)
                      .map_err(|e| PersistenceError::new(StoreOp::RunMigrations, StoreFault::Unknown(format!("migration error: {e}"))))?;
    if !applied.is_empty() {
        info!("applied {} pending migration(s)", applied.len());
    }
    Ok(())
}
