//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity** and are compared by their attributes.
/// Order line items and shipping addresses are value objects: once embedded
/// in an order they are never edited in place, only replaced.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Address {
///     city: String,
///     zip: String,
/// }
///
/// impl ValueObject for Address {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
