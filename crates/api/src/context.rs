use shopfront_auth::{Permission, Principal, Role};
use shopfront_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; every protected handler can rely on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> &UserId {
        &self.principal.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.principal.email.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.principal.display_name.as_deref()
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.principal.permissions
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }
}
