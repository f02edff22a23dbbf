//! Admin order workflow and the order read side.

use chrono::Utc;
use tracing::{info, instrument};

use shopfront_core::{OrderId, UserId};
use shopfront_orders::{Order, OrderStatus};

use crate::error::ServiceError;
use crate::store::{OrderFilter, Store, StoreTransaction, settle};

#[derive(Debug, Clone)]
pub struct FulfilmentService<S> {
    store: S,
}

impl<S> FulfilmentService<S>
where
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Move an order to `status`, optionally recording a tracking number.
    ///
    /// Stock is never touched here: cancelling an order does not restock.
    #[instrument(skip(self, tracking_number), fields(order_id = %order_id, status = %status), err)]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.store.begin().await?;
        let result = transition_locked(&mut tx, order_id, status, tracking_number).await;
        let order = settle(tx, result).await?;

        info!("order status updated");
        Ok(order)
    }

    pub async fn order(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.store
            .order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))
    }

    /// The user's orders, newest first.
    pub async fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.orders(OrderFilter::for_user(user_id.clone())).await?)
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.orders(OrderFilter::all()).await?)
    }
}

async fn transition_locked<Tx>(
    tx: &mut Tx,
    order_id: OrderId,
    status: OrderStatus,
    tracking_number: Option<String>,
) -> Result<Order, ServiceError>
where
    Tx: StoreTransaction,
{
    let mut order = tx
        .order_for_update(order_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))?;
    order.transition(status, tracking_number, Utc::now())?;
    tx.save_order(order.clone()).await?;
    Ok(order)
}
