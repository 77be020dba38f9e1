#![allow(dead_code)]

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use phd_persistence::pg::{build_pool, PgPool, PoolProvider};
use phd_persistence::DbConfig;
use once_cell::sync::Lazy;

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    if std::env::var("DATABASE_URL").is_err() {
        return None;
    }
    let cfg = match DbConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Config de test inválida: {e}");
            return None;
        }
    };
    match build_pool(&cfg.url, 1, 4) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub fn provider() -> Option<PoolProvider> {
    match TEST_POOL.as_ref() {
        Some(pool) => Some(PoolProvider { pool: pool.clone() }),
        None => {
            eprintln!("DATABASE_URL no definido: omitiendo test");
            None
        }
    }
}

#[derive(QueryableByName)]
struct IdRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

/// Inserta un usuario con email único y devuelve su id.
pub fn insert_user(pool: &PgPool, first_name: &str, last_name: &str, role: &str) -> i64 {
    let mut conn = pool.get().expect("conn");
    let email = format!("{}.{}@test.local", first_name.to_lowercase(), uuid::Uuid::new_v4());
    diesel::sql_query("INSERT INTO users (first_name, last_name, email, role) VALUES ($1, $2, $3, $4) RETURNING id")
        .bind::<Text, _>(first_name)
        .bind::<Text, _>(last_name)
        .bind::<Text, _>(email)
        .bind::<Text, _>(role)
        .get_result::<IdRow>(&mut conn)
        .expect("insert user")
        .id
}

/// Tipo de formulario único por test para aislar conteos en la base compartida.
pub fn unique_form_type(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Corre SQL arbitrario de preparación (p.ej. retrasar timestamps).
pub fn exec(pool: &PgPool, sql: &str) {
    let mut conn = pool.get().expect("conn");
    diesel::sql_query(sql).execute(&mut conn).expect("exec");
}
