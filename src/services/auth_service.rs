use crate::dto::auth_dto::LoginRequest;
use crate::error::Result;
use crate::models::user::User;
use crate::utils::{token, validation};

/// Local identity stub. No credentials are checked.
pub struct AuthService;

impl AuthService {
    pub fn login(req: LoginRequest) -> Result<User> {
        validation::validate(&req)?;

        let email = req.email.trim().to_string();
        let name = req
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        let user = User {
            id: token::generate_id(token::ID_LENGTH),
            name,
            email,
            role: req.role,
        };
        tracing::info!(user_id = %user.id, role = ?user.role, "User signed in");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::user::UserRole;

    #[test]
    fn derives_name_from_email() {
        let user = AuthService::login(LoginRequest {
            name: None,
            email: "ada@example.com".to_string(),
            role: UserRole::Student,
        })
        .unwrap();
        assert_eq!(user.name, "ada");
        assert_eq!(user.role, UserRole::Student);
        assert!(!user.id.is_empty());
    }

    #[test]
    fn rejects_malformed_email() {
        let err = AuthService::login(LoginRequest {
            name: Some("Ada".to_string()),
            email: "not-an-email".to_string(),
            role: UserRole::Admin,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn issues_fresh_ids() {
        let req = LoginRequest {
            name: Some("Ada".to_string()),
            email: "ada@example.com".to_string(),
            role: UserRole::Admin,
        };
        let first = AuthService::login(req.clone()).unwrap();
        let second = AuthService::login(req).unwrap();
        assert_ne!(first.id, second.id);
    }
}
