//! Team and user read models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Team registered for a hackathon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub hackathon_id: Uuid,
    pub name: String,
    pub leader_id: Uuid,
    pub members: Vec<Uuid>,
}

impl Team {
    /// Leader counts as a member even if not listed
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.leader_id == user_id || self.members.contains(&user_id)
    }
}

/// Minimal user record used to resolve judges
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}
