//! Catalog domain module.
//!
//! Products and the stock rule that guards them, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{MAX_REVIEWS, MAX_STOCK, NewProduct, Product, ProductPatch, ProductRecord, StockError};
