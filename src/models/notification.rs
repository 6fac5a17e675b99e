use rocket::serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A profile found inside the notification radius of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationTarget {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl NotificationTarget {
    /// Name used in the greeting; blank names fall back to a generic salutation.
    pub fn greeting_name(&self) -> &str {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => "utilizador",
        }
    }
}
