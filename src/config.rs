//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una vez y arma `AppConfig` con la
//! conexión a Postgres más los parámetros de los stores.
use std::env;

use phd_core::{TransitionPolicy, DEFAULT_RETENTION_DAYS};
use phd_persistence::config::parse_or;
use phd_persistence::{init_dotenv, ConfigError, DbConfig};

/// Configuración global de la aplicación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Conexión y tamaño del pool.
    pub database: DbConfig,
    /// Días por defecto de `progress cleanup` (`FORM_PROGRESS_RETENTION_DAYS`).
    pub retention_days: u32,
    /// `SUBMISSION_TRANSITIONS`: `lenient` (por defecto) o `strict`.
    pub transition_policy: TransitionPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        init_dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let database = DbConfig::from_lookup(&lookup)?;
        let retention_days = parse_or(&lookup, "FORM_PROGRESS_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?;
        let transition_policy = parse_or(&lookup, "SUBMISSION_TRANSITIONS", TransitionPolicy::default())?;
        Ok(Self { database, retention_days, transition_policy })
    }
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
    fn defaults_apply_when_only_url_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/phd")])).unwrap();
        assert_eq!(cfg.retention_days, 30);
        assert_eq!(cfg.transition_policy, TransitionPolicy::Lenient);
        assert_eq!(cfg.database.max_connections, 16);
    }

    #[test]
    fn strict_transitions_and_custom_retention() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/phd"),
                                                  ("FORM_PROGRESS_RETENTION_DAYS", "7"),
                                                  ("SUBMISSION_TRANSITIONS", " STRICT ")])).unwrap();
        assert_eq!(cfg.retention_days, 7);
        assert!(cfg.transition_policy.is_strict());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/phd"),
                                                  ("SUBMISSION_TRANSITIONS", "whatever")])).unwrap_err();
        assert_eq!(err,
                   ConfigError::InvalidValue { name: "SUBMISSION_TRANSITIONS",
                                               value: "whatever".into() });
    }

    #[test]
    fn missing_url_is_an_error() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])).unwrap_err(), ConfigError::MissingDatabaseUrl);
    }
}
