//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` y parámetros opcionales de pool.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use thiserror::Error;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables inyectable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty())
                                        .ok_or(ConfigError::MissingDatabaseUrl)?;
        let min_connections = parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 2)?;
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 16)?;
        Ok(Self { url, min_connections, max_connections })
    }
}

/// Lee una variable numérica; ausente => `default`, inválida => error.
pub fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
    where F: Fn(&str) -> Option<String>,
          T: std::str::FromStr
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_pool_sizes_are_missing() {
        let cfg = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/phd")])).unwrap();
        assert_eq!(cfg.min_connections, 2);
        assert_eq!(cfg.max_connections, 16);
    }

    #[test]
    fn missing_url_is_an_error() {
        assert_eq!(DbConfig::from_lookup(lookup(&[])), Err(ConfigError::MissingDatabaseUrl));
        assert_eq!(DbConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])), Err(ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn garbage_pool_size_is_reported() {
        let err = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("DATABASE_MAX_CONNECTIONS", "lots")]))
            .unwrap_err();
        assert_eq!(err,
                   ConfigError::InvalidValue { name: "DATABASE_MAX_CONNECTIONS",
                                               value: "lots".into() });
    }
}
