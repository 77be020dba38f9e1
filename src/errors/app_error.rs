use phd_core::PersistenceError;
use phd_domain::DomainError;
use phd_persistence::ConfigError;
use thiserror::Error;

/// Errores del binario: envuelve cada capa sin perder su mensaje.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración: {0}")]
    Config(#[from] ConfigError),
    #[error("Uso inválido: {0}")]
    Usage(String),
    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Valor inválido: {0}")]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl AppError {
    /// `2` para errores de entrada del operador, `5` para configuración y
    /// almacenamiento.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Json(_) | Self::Domain(_) => 2,
            Self::Config(_) | Self::Persistence(_) => 5,
        }
    }
}
