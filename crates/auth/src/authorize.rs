use std::collections::HashSet;

use thiserror::Error;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Static role → permission policy.
///
/// Admins get the wildcard; customers can place and read their own orders.
/// Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for role in roles {
        let granted = if *role == Role::ADMIN {
            vec![Permission::WILDCARD]
        } else if *role == Role::CUSTOMER {
            vec![Permission::ORDERS_CREATE, Permission::ORDERS_READ_OWN]
        } else {
            Vec::new()
        };
        for p in granted {
            if !out.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::JwtClaims;

    fn principal(admin: bool) -> Principal {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Principal::from_claims(&JwtClaims {
            sub: "user-1".to_string(),
            email: None,
            name: Some("Ada".to_string()),
            admin,
            issued_at: now,
            expires_at: now + Duration::hours(1),
        })
        .unwrap()
    }

    #[test]
    fn customers_can_order_but_not_administer() {
        let p = principal(false);
        assert!(!p.is_admin());
        assert_eq!(authorize(&p, &Permission::ORDERS_CREATE), Ok(()));
        assert_eq!(authorize(&p, &Permission::ORDERS_READ_OWN), Ok(()));
        assert_eq!(
            authorize(&p, &Permission::PRODUCTS_WRITE),
            Err(AuthzError::Forbidden("products.write".to_string()))
        );
        assert!(authorize(&p, &Permission::ORDERS_READ_ALL).is_err());
        assert!(authorize(&p, &Permission::ORDERS_CREATE_FOR_OTHERS).is_err());
    }

    #[test]
    fn admins_hold_the_wildcard() {
        let p = principal(true);
        assert!(p.is_admin());
        assert_eq!(p.permissions, vec![Permission::WILDCARD]);
        assert_eq!(authorize(&p, &Permission::ORDERS_UPDATE_STATUS), Ok(()));
        assert_eq!(authorize(&p, &Permission::PRODUCTS_WRITE), Ok(()));
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        assert!(permissions_for_roles(&[Role::new("auditor")]).is_empty());
    }
}
