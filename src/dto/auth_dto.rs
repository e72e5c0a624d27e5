use crate::models::user::UserRole;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Display name; derived from the email when absent.
    #[serde(default)]
    pub name: Option<String>,
    #[validate(email)]
    pub email: String,
    pub role: UserRole,
}
