use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.create").
/// A special wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    /// Place an order for oneself.
    pub const ORDERS_CREATE: Permission = Permission(Cow::Borrowed("orders.create"));
    /// Read one's own orders.
    pub const ORDERS_READ_OWN: Permission = Permission(Cow::Borrowed("orders.read_own"));
    /// Read every order (admin order list).
    pub const ORDERS_READ_ALL: Permission = Permission(Cow::Borrowed("orders.read_all"));
    /// Place an order on behalf of another user.
    pub const ORDERS_CREATE_FOR_OTHERS: Permission =
        Permission(Cow::Borrowed("orders.create_for_others"));
    /// Change order status / tracking number.
    pub const ORDERS_UPDATE_STATUS: Permission = Permission(Cow::Borrowed("orders.update_status"));
    /// Create, edit and delete catalog products.
    pub const PRODUCTS_WRITE: Permission = Permission(Cow::Borrowed("products.write"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
