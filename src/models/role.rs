//! Role model - named permission bundles.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fixed role enumeration. Role records are read-only from the core's
/// perspective; only the three self-service roles may register themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleName {
    Admin,
    Manager,
    Employee,
    Agency,
    Agent,
    User,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "Admin",
            RoleName::Manager => "Manager",
            RoleName::Employee => "Employee",
            RoleName::Agency => "Agency",
            RoleName::Agent => "Agent",
            RoleName::User => "User",
        }
    }
}

impl std::str::FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(RoleName::Admin),
            "Manager" => Ok(RoleName::Manager),
            "Employee" => Ok(RoleName::Employee),
            "Agency" => Ok(RoleName::Agency),
            "Agent" => Ok(RoleName::Agent),
            "User" => Ok(RoleName::User),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Role entity. Permissions are flat `resource:action` strings embedded
/// into access tokens at issuance.
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub role_name: String,
    pub permissions: Vec<String>,
    pub description: Option<String>,
}

impl Role {
    pub fn new(name: RoleName, permissions: Vec<String>) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            role_name: name.as_str().to_string(),
            permissions,
            description: None,
        }
    }

    pub fn name(&self) -> Option<RoleName> {
        self.role_name.parse().ok()
    }

    /// Whether accounts with this role are auto-approved at registration.
    pub fn is_self_service(&self) -> bool {
        self.role_name == RoleName::User.as_str()
    }
}

/// Default role set with their permission bundles, used for seeding a
/// fresh store.
pub fn default_roles() -> Vec<Role> {
    vec![
        Role::new(
            RoleName::Admin,
            vec![
                "users:manage".to_string(),
                "agencies:manage".to_string(),
                "listings:manage".to_string(),
                "roles:manage".to_string(),
            ],
        ),
        Role::new(
            RoleName::Manager,
            vec![
                "users:approve".to_string(),
                "agencies:approve".to_string(),
                "listings:approve".to_string(),
            ],
        ),
        Role::new(RoleName::Employee, vec!["listings:review".to_string()]),
        Role::new(
            RoleName::Agency,
            vec![
                "agents:manage".to_string(),
                "listings:create".to_string(),
                "listings:edit".to_string(),
            ],
        ),
        Role::new(
            RoleName::Agent,
            vec!["listings:create".to_string(), "listings:edit".to_string()],
        ),
        Role::new(RoleName::User, vec!["listings:create".to_string()]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_round_trip() {
        for name in [
            RoleName::Admin,
            RoleName::Manager,
            RoleName::Employee,
            RoleName::Agency,
            RoleName::Agent,
            RoleName::User,
        ] {
            assert_eq!(name.as_str().parse::<RoleName>().unwrap(), name);
        }
    }

    #[test]
    fn only_user_role_is_self_service() {
        let roles = default_roles();
        let self_service: Vec<_> = roles.iter().filter(|r| r.is_self_service()).collect();
        assert_eq!(self_service.len(), 1);
        assert_eq!(self_service[0].role_name, "User");
    }
}
