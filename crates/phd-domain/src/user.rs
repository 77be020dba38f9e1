use serde::{Deserialize, Serialize};

/// Identificador de la entidad externa `users`.
pub type UserId = i64;

/// Vista de solo lectura de un usuario (la tabla pertenece a otra capa).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
}

impl UserProfile {
    pub fn new(id: UserId, first_name: &str, last_name: &str, email: &str, role: &str) -> Self {
        Self { id,
               first_name: first_name.to_string(),
               last_name: last_name.to_string(),
               email: email.to_string(),
               role: role.to_string() }
    }
}
