use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The subset of a user record that is safe to return to clients.
/// The password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
}
