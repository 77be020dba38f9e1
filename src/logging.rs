//! Inicialización de logs del binario.
//!
//! Los crates de librería escriben vía `log`; el subscriber de
//! `tracing-subscriber` recoge esos registros (puente `tracing-log`) y los
//! emite por stderr, dejando stdout libre para la salida JSON.

use tracing_subscriber::EnvFilter;

/// Filtro desde `RUST_LOG`; por defecto `info`. Llamar más de una vez no
/// falla (el segundo intento se ignora).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter)
                                     .with_writer(std::io::stderr)
                                     .with_target(false)
                                     .try_init();
}
