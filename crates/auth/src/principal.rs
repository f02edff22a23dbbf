use shopfront_core::{DomainError, UserId};

use crate::{JwtClaims, Permission, Role, authorize::permissions_for_roles};

/// A fully resolved principal for authorization decisions.
///
/// Built from verified claims; no storage lookup is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn from_claims(claims: &JwtClaims) -> Result<Self, DomainError> {
        let user_id = UserId::new(claims.sub.clone())?;
        let roles = if claims.admin {
            vec![Role::ADMIN]
        } else {
            vec![Role::CUSTOMER]
        };
        let permissions = permissions_for_roles(&roles);
        Ok(Self {
            user_id,
            email: claims.email.clone(),
            display_name: claims.name.clone(),
            roles,
            permissions,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::ADMIN)
    }
}
