//! API-side authorization guard.
//!
//! Handlers call this before touching any service, so the services stay
//! auth-agnostic.

use shopfront_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Check that the request principal holds every permission in `required`.
pub fn authorize_request(principal: &PrincipalContext, required: &[Permission]) -> Result<(), AuthzError> {
    for perm in required {
        authorize(principal.principal(), perm)?;
    }
    Ok(())
}
