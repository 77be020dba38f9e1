//! phd-tracker
//!
//! Binario de operación sobre los stores de formularios de doctorado:
//! - `config`: variables de entorno (.env) hacia `AppConfig`.
//! - `cli`: parseo de subcomandos y despacho genérico sobre los traits de
//!   `phd-core` (Postgres en producción, memoria en tests).
//! - `errors`: `AppError` y su código de salida.
//! - `logging`: subscriber de `tracing-subscriber` para los logs de `log`.

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
