//! Orders domain module.
//!
//! Order records, their line-item snapshots and the admin status lifecycle,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    Order, OrderLineItem, OrderRecord, OrderStatus, PaymentStatus, PlaceOrder, ShippingAddress,
};
