//! `shopfront-auth`: authentication/authorization boundary.
//!
//! Tokens are issued by an external identity provider; this crate only
//! verifies them and turns their claims into a [`Principal`]. It is
//! decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, permissions_for_roles, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
