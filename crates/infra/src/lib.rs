//! Infrastructure layer: stores, transaction scopes and the application
//! services that run on top of them.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fulfilment;
pub mod order_coordinator;
pub mod store;

pub use catalog::CatalogService;
pub use config::{ConfigError, StoreConfig};
pub use error::ServiceError;
pub use fulfilment::FulfilmentService;
pub use order_coordinator::{OrderCoordinator, OrderError};
pub use store::{
    InMemoryStore, InventoryLedger, OrderFilter, PostgresStore, Store, StoreError, StoreTransaction,
};
