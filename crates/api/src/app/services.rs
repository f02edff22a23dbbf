//! Store selection and service wiring.
//!
//! One variant per backend; every method matches on the variant so handlers
//! never see the concrete store type.

use tracing::info;

use shopfront_catalog::{NewProduct, Product, ProductPatch};
use shopfront_core::{OrderId, ProductId, UserId};
use shopfront_infra::{
    CatalogService, FulfilmentService, InMemoryStore, OrderCoordinator, OrderError, PostgresStore,
    ServiceError, StoreConfig, StoreError,
};
use shopfront_orders::{Order, OrderStatus, PlaceOrder};

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        orders: OrderCoordinator<InMemoryStore>,
        catalog: CatalogService<InMemoryStore>,
        fulfilment: FulfilmentService<InMemoryStore>,
    },
    Postgres {
        orders: OrderCoordinator<PostgresStore>,
        catalog: CatalogService<PostgresStore>,
        fulfilment: FulfilmentService<PostgresStore>,
    },
}

impl AppServices {
    /// In-memory wiring (dev/test).
    pub fn in_memory() -> Self {
        Self::over_in_memory(InMemoryStore::new())
    }

    pub fn over_in_memory(store: InMemoryStore) -> Self {
        AppServices::InMemory {
            orders: OrderCoordinator::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            fulfilment: FulfilmentService::new(store),
        }
    }

    pub fn over_postgres(store: PostgresStore) -> Self {
        AppServices::Postgres {
            orders: OrderCoordinator::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            fulfilment: FulfilmentService::new(store),
        }
    }

    /// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match &config.database_url {
            Some(url) => {
                let store = PostgresStore::connect(url, config.max_connections, config.lock_timeout).await?;
                store.ensure_schema().await?;
                info!(max_connections = config.max_connections, "using postgres store");
                Ok(Self::over_postgres(store))
            }
            None => {
                info!("DATABASE_URL not set; using in-memory store");
                Ok(Self::over_in_memory(InMemoryStore::with_lock_timeout(
                    config.lock_timeout,
                )))
            }
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory { .. } => "in_memory",
            AppServices::Postgres { .. } => "postgres",
        }
    }

    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, OrderError> {
        match self {
            AppServices::InMemory { orders, .. } => orders.place_order(cmd).await,
            AppServices::Postgres { orders, .. } => orders.place_order(cmd).await,
        }
    }

    pub async fn order(&self, id: OrderId) -> Result<Order, ServiceError> {
        match self {
            AppServices::InMemory { fulfilment, .. } => fulfilment.order(id).await,
            AppServices::Postgres { fulfilment, .. } => fulfilment.order(id).await,
        }
    }

    pub async fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, ServiceError> {
        match self {
            AppServices::InMemory { fulfilment, .. } => fulfilment.orders_for_user(user_id).await,
            AppServices::Postgres { fulfilment, .. } => fulfilment.orders_for_user(user_id).await,
        }
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, ServiceError> {
        match self {
            AppServices::InMemory { fulfilment, .. } => fulfilment.all_orders().await,
            AppServices::Postgres { fulfilment, .. } => fulfilment.all_orders().await,
        }
    }

    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, ServiceError> {
        match self {
            AppServices::InMemory { fulfilment, .. } => {
                fulfilment.update_status(id, status, tracking_number).await
            }
            AppServices::Postgres { fulfilment, .. } => {
                fulfilment.update_status(id, status, tracking_number).await
            }
        }
    }

    pub async fn product(&self, id: ProductId) -> Result<Product, ServiceError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.product(id).await,
            AppServices::Postgres { catalog, .. } => catalog.product(id).await,
        }
    }

    pub async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, ServiceError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.products(category).await,
            AppServices::Postgres { catalog, .. } => catalog.products(category).await,
        }
    }

    pub async fn create_product(&self, input: NewProduct) -> Result<Product, ServiceError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.create_product(input).await,
            AppServices::Postgres { catalog, .. } => catalog.create_product(input).await,
        }
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product, ServiceError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.update_product(id, patch).await,
            AppServices::Postgres { catalog, .. } => catalog.update_product(id, patch).await,
        }
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        match self {
            AppServices::InMemory { catalog, .. } => catalog.delete_product(id).await,
            AppServices::Postgres { catalog, .. } => catalog.delete_product(id).await,
        }
    }
}
