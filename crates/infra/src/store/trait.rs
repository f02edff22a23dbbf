use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shopfront_catalog::Product;
use shopfront_core::{OrderId, ProductId, UserId};
use shopfront_orders::Order;

/// Store operation error.
///
/// These are **infrastructure errors** (locking, connectivity, decoding) as
/// opposed to domain errors (validation, invariants, stock).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lock wait timed out, serialization failure or deadlock. The whole
    /// transaction was abandoned and may be retried from scratch.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A row with the same key already exists.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The backing store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A value could not be converted to or from its stored form.
    #[error("stored value mismatch: {0}")]
    Decode(String),
}

/// Read side filter for order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.user_id
            .as_ref()
            .is_none_or(|user_id| order.is_owned_by(user_id))
    }
}

/// Inventory read/decrement contract.
///
/// `get_for_update` returns the current row and holds an exclusive lock on it
/// until the owning transaction commits or aborts. A bounded lock wait that
/// runs out surfaces as [`StoreError::Conflict`].
///
/// `save` stages a new value; other readers only see it after commit.
#[async_trait]
pub trait InventoryLedger: Send {
    async fn get_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn save(&mut self, product: Product) -> Result<(), StoreError>;
}

/// A single all-or-nothing unit of work.
///
/// Dropping a transaction without calling [`StoreTransaction::commit`]
/// discards every staged write and releases its locks.
#[async_trait]
pub trait StoreTransaction: InventoryLedger {
    async fn insert_product(&mut self, product: Product) -> Result<(), StoreError>;

    /// Returns `false` if the product did not exist.
    async fn delete_product(&mut self, id: ProductId) -> Result<bool, StoreError>;

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn insert_order(&mut self, order: Order) -> Result<(), StoreError>;

    async fn save_order(&mut self, order: Order) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Transactional store for products and orders.
///
/// Reads outside a transaction see the last committed state and never take
/// row locks. There is no write path outside [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: StoreTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Products ordered by creation time, optionally restricted to a category
    /// (case-insensitive).
    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Orders matching `filter`, newest first.
    async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError>;
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product(id).await
    }

    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError> {
        (**self).products(category).await
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).order(id).await
    }

    async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        (**self).orders(filter).await
    }
}
