use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Buyer,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Buyer => "buyer",
            Role::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(Role::Farmer),
            "buyer" => Ok(Role::Buyer),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(DomainError::Internal(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller, resolved by access control before any service
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub approved: bool,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            approved: user.approved,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Superadmin
    }

    pub fn require_role(&self, roles: &[Role]) -> Result<&Self, DomainError> {
        if roles.contains(&self.role) {
            Ok(self)
        } else {
            Err(DomainError::forbidden(
                "Access denied - Insufficient permissions",
            ))
        }
    }

    /// Superadmins pass regardless of their flag.
    pub fn require_approved(&self) -> Result<&Self, DomainError> {
        if self.approved || self.is_admin() {
            Ok(self)
        } else {
            Err(DomainError::forbidden("Your account is pending approval"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, approved: bool) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            role,
            approved,
        }
    }

    #[test]
    fn role_gate_rejects_other_roles() {
        let farmer = principal(Role::Farmer, true);
        assert!(farmer.require_role(&[Role::Farmer]).is_ok());
        assert!(matches!(
            farmer.require_role(&[Role::Buyer]),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn unapproved_user_is_gated() {
        let buyer = principal(Role::Buyer, false);
        let err = buyer.require_approved().unwrap_err();
        assert_eq!(err.to_string(), "Your account is pending approval");
    }

    #[test]
    fn superadmin_bypasses_approval() {
        assert!(principal(Role::Superadmin, false).require_approved().is_ok());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), "\"superadmin\"");
        assert_eq!("buyer".parse::<Role>().unwrap(), Role::Buyer);
    }
}
