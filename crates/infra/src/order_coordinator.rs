//! Order placement: the stock check, the stock decrement and the order insert
//! run as one all-or-nothing transaction.
//!
//! ```text
//! PlaceOrder
//!   ↓
//! 1. Validate input (no store access)
//!   ↓
//! 2. Begin transaction
//!   ↓
//! 3. For each line, in cart order: lock row → check stock → decrement → stage
//!   ↓
//! 4. Assemble order (status pending) → stage insert
//!   ↓
//! 5. Commit; on any failure roll back and return that failure
//! ```
//!
//! The coordinator never retries. [`OrderError::is_retryable`] tells the
//! caller whether resubmitting the same cart can succeed.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use shopfront_catalog::StockError;
use shopfront_core::{DomainError, OrderId, ProductId};
use shopfront_orders::{Order, PlaceOrder};

use crate::store::{Store, StoreError, StoreTransaction, settle};

#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed input. Nothing was read or written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A line item references a product that does not exist.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// A line item asks for more units than are in stock.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Lock wait timed out, deadlock or serialization failure.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl OrderError {
    /// Whether resubmitting the same order may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::Conflict(_) | OrderError::Store(_))
    }
}

impl From<StoreError> for OrderError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => OrderError::Conflict(msg),
            other => OrderError::Store(other),
        }
    }
}

impl From<DomainError> for OrderError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => OrderError::Validation(msg),
        }
    }
}

/// Runs order placement against a [`Store`].
#[derive(Debug, Clone)]
pub struct OrderCoordinator<S> {
    store: S,
}

impl<S> OrderCoordinator<S>
where
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Place an order: decrement stock for every line and record the order,
    /// atomically.
    ///
    /// On error no stock has changed and no order exists.
    #[instrument(
        skip(self, cmd),
        fields(user_id = %cmd.user_id, line_count = cmd.items.len()),
        err
    )]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, OrderError> {
        cmd.validate()?;

        match cmd.computed_total() {
            Some(computed) if computed != cmd.total => warn!(
                submitted = %cmd.total,
                computed = %computed,
                "order total does not match its line items; keeping the submitted total"
            ),
            Some(_) => {}
            None => warn!(
                submitted = %cmd.total,
                "line item subtotals overflow; keeping the submitted total"
            ),
        }

        let mut tx = self.store.begin().await?;
        let result = reserve_and_record(&mut tx, &cmd).await;
        let order = settle(tx, result).await?;

        info!(order_id = %order.id_typed(), total = %order.total(), "order placed");
        Ok(order)
    }
}

async fn reserve_and_record<Tx>(tx: &mut Tx, cmd: &PlaceOrder) -> Result<Order, OrderError>
where
    Tx: StoreTransaction,
{
    for item in &cmd.items {
        let product_id = item.product_id;
        let mut product = tx
            .get_for_update(product_id)
            .await?
            .ok_or(OrderError::NotFound(product_id))?;

        product
            .decrement_stock(item.quantity)
            .map_err(|e| match e {
                StockError::Insufficient {
                    requested,
                    available,
                } => OrderError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                },
                StockError::ZeroQuantity => OrderError::Validation(e.to_string()),
            })?;

        tx.save(product).await?;
    }

    let order = Order::assemble(OrderId::new(), cmd, Utc::now());
    tx.insert_order(order.clone()).await?;
    Ok(order)
}
