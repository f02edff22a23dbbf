//! Transactional document store boundary.
//!
//! Products and orders live behind one [`Store`]. Every write goes through a
//! [`StoreTransaction`]: rows are locked on first touch, writes are staged and
//! become visible together on commit, or not at all.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use r#trait::{InventoryLedger, OrderFilter, Store, StoreError, StoreTransaction};

use tracing::warn;

/// Commit `tx` if `result` is `Ok`, otherwise roll it back and hand the
/// original error back to the caller.
///
/// A failed rollback is only logged: the transaction is already abandoned and
/// its staged writes are discarded either way.
pub async fn settle<Tx, T, E>(tx: Tx, result: Result<T, E>) -> Result<T, E>
where
    Tx: StoreTransaction,
    E: From<StoreError>,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
