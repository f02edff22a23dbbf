use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};

use shopfront_catalog::Product;
use shopfront_core::{OrderId, ProductId};
use shopfront_orders::Order;

use super::r#trait::{InventoryLedger, OrderFilter, Store, StoreError, StoreTransaction};

/// Default bound on how long a transaction waits for a row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Product(ProductId),
    Order(OrderId),
}

impl core::fmt::Display for LockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LockKey::Product(id) => write!(f, "product {id}"),
            LockKey::Order(id) => write!(f, "order {id}"),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
}

#[derive(Debug)]
struct Inner {
    state: RwLock<State>,
    row_locks: Mutex<HashMap<LockKey, Arc<RowMutex<()>>>>,
    lock_timeout: Duration,
}

impl Inner {
    fn poisoned() -> StoreError {
        StoreError::Unavailable("in-memory state lock poisoned".to_string())
    }

    fn row_lock(&self, key: LockKey) -> Result<Arc<RowMutex<()>>, StoreError> {
        let mut locks = self.row_locks.lock().map_err(|_| Self::poisoned())?;
        Ok(locks.entry(key).or_default().clone())
    }

    /// Forget row locks nobody holds or waits on.
    fn prune_row_locks(&self) {
        if let Ok(mut locks) = self.row_locks.lock() {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
    }
}

/// In-memory transactional store.
///
/// Intended for tests/dev. Rows are locked pessimistically with one async
/// mutex per product/order; committed state sits behind a single `RwLock` so
/// a commit publishes all of its writes at once.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                row_locks: Mutex::new(HashMap::new()),
                lock_timeout,
            }),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.inner.lock_timeout
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(InMemoryTransaction {
            inner: self.inner.clone(),
            held: HashMap::new(),
            products: HashMap::new(),
            orders: HashMap::new(),
        })
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.inner.state.read().map_err(|_| Inner::poisoned())?;
        Ok(state.products.get(&id).cloned())
    }

    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError> {
        let state = self.inner.state.read().map_err(|_| Inner::poisoned())?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| category.is_none_or(|c| p.category().eq_ignore_ascii_case(c)))
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id_typed().cmp(&b.id_typed()))
        });
        Ok(products)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.inner.state.read().map_err(|_| Inner::poisoned())?;
        Ok(state.orders.get(&id).cloned())
    }

    async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let state = self.inner.state.read().map_err(|_| Inner::poisoned())?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });
        Ok(orders)
    }
}

#[derive(Debug)]
enum Staged<T> {
    Upsert(T),
    Deleted,
}

/// Transaction over [`InMemoryStore`].
///
/// Holds the row locks it has taken and the writes it has staged. Nothing
/// reaches shared state until [`StoreTransaction::commit`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    inner: Arc<Inner>,
    held: HashMap<LockKey, OwnedMutexGuard<()>>,
    products: HashMap<ProductId, Staged<Product>>,
    orders: HashMap<OrderId, Staged<Order>>,
}

impl InMemoryTransaction {
    async fn lock(&mut self, key: LockKey) -> Result<(), StoreError> {
        if self.held.contains_key(&key) {
            return Ok(());
        }
        let row = self.inner.row_lock(key)?;
        let guard = tokio::time::timeout(self.inner.lock_timeout, row.lock_owned())
            .await
            .map_err(|_| {
                StoreError::Conflict(format!(
                    "timed out after {:?} waiting for lock on {key}",
                    self.inner.lock_timeout
                ))
            })?;
        self.held.insert(key, guard);
        Ok(())
    }

    fn committed_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.inner.state.read().map_err(|_| Inner::poisoned())?;
        Ok(state.products.get(&id).cloned())
    }

    fn committed_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.inner.state.read().map_err(|_| Inner::poisoned())?;
        Ok(state.orders.get(&id).cloned())
    }

    fn current_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        match self.products.get(&id) {
            Some(Staged::Upsert(p)) => Ok(Some(p.clone())),
            Some(Staged::Deleted) => Ok(None),
            None => self.committed_product(id),
        }
    }

    fn current_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        match self.orders.get(&id) {
            Some(Staged::Upsert(o)) => Ok(Some(o.clone())),
            Some(Staged::Deleted) => Ok(None),
            None => self.committed_order(id),
        }
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        self.held.clear();
        self.inner.prune_row_locks();
    }
}

#[async_trait]
impl InventoryLedger for InMemoryTransaction {
    async fn get_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.lock(LockKey::Product(id)).await?;
        self.current_product(id)
    }

    async fn save(&mut self, product: Product) -> Result<(), StoreError> {
        let id = product.id_typed();
        self.lock(LockKey::Product(id)).await?;
        self.products.insert(id, Staged::Upsert(product));
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_product(&mut self, product: Product) -> Result<(), StoreError> {
        let id = product.id_typed();
        self.lock(LockKey::Product(id)).await?;
        if self.current_product(id)?.is_some() {
            return Err(StoreError::Duplicate(format!("product {id} already exists")));
        }
        self.products.insert(id, Staged::Upsert(product));
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool, StoreError> {
        self.lock(LockKey::Product(id)).await?;
        if self.current_product(id)?.is_none() {
            return Ok(false);
        }
        self.products.insert(id, Staged::Deleted);
        Ok(true)
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.lock(LockKey::Order(id)).await?;
        self.current_order(id)
    }

    async fn insert_order(&mut self, order: Order) -> Result<(), StoreError> {
        let id = order.id_typed();
        self.lock(LockKey::Order(id)).await?;
        if self.current_order(id)?.is_some() {
            return Err(StoreError::Duplicate(format!("order {id} already exists")));
        }
        self.orders.insert(id, Staged::Upsert(order));
        Ok(())
    }

    async fn save_order(&mut self, order: Order) -> Result<(), StoreError> {
        let id = order.id_typed();
        self.lock(LockKey::Order(id)).await?;
        self.orders.insert(id, Staged::Upsert(order));
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let products = std::mem::take(&mut self.products);
        let orders = std::mem::take(&mut self.orders);

        // Row locks are still held here and only released when `self` drops.
        let mut state = self.inner.state.write().map_err(|_| Inner::poisoned())?;
        for (id, staged) in products {
            match staged {
                Staged::Upsert(p) => {
                    state.products.insert(id, p);
                }
                Staged::Deleted => {
                    state.products.remove(&id);
                }
            }
        }
        for (id, staged) in orders {
            match staged {
                Staged::Upsert(o) => {
                    state.orders.insert(id, o);
                }
                Staged::Deleted => {
                    state.orders.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
