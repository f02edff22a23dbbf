//! Admin catalog writes.
//!
//! Every write locks the product row the same way order placement does, so a
//! restock and a checkout against one product never interleave.

use chrono::Utc;
use tracing::{info, instrument};

use shopfront_catalog::{NewProduct, Product, ProductPatch};
use shopfront_core::ProductId;

use crate::error::ServiceError;
use crate::store::{Store, StoreTransaction, settle};

#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S> CatalogService<S>
where
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, ServiceError> {
        let product = Product::create(ProductId::new(), input, Utc::now())?;

        let mut tx = self.store.begin().await?;
        let result = tx
            .insert_product(product.clone())
            .await
            .map_err(ServiceError::from);
        settle(tx, result).await?;

        info!(product_id = %product.id_typed(), stock = product.stock(), "product created");
        Ok(product)
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product, ServiceError> {
        let mut tx = self.store.begin().await?;
        let result = patch_locked(&mut tx, id, patch).await;
        let product = settle(tx, result).await?;

        info!(stock = product.stock(), "product updated");
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        let result = match tx.delete_product(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ServiceError::NotFound(format!("product {id}"))),
            Err(e) => Err(e.into()),
        };
        settle(tx, result).await?;

        info!("product deleted");
        Ok(())
    }

    pub async fn product(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .product(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))
    }

    pub async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.products(category).await?)
    }
}

async fn patch_locked<Tx>(tx: &mut Tx, id: ProductId, patch: ProductPatch) -> Result<Product, ServiceError>
where
    Tx: StoreTransaction,
{
    let mut product = tx
        .get_for_update(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))?;
    product.apply_patch(patch, Utc::now())?;
    tx.save(product.clone()).await?;
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use crate::store::InMemoryStore;

    fn lamp(stock: u32) -> NewProduct {
        NewProduct {
            name: "Desk Lamp".to_string(),
            description: "Warm light".to_string(),
            price: Decimal::new(2999, 2),
            image: "lamp.jpg".to_string(),
            images: vec!["lamp-2.jpg".to_string()],
            category: "Home".to_string(),
            stock,
            specifications: Default::default(),
            badge: Some("New".to_string()),
        }
    }

    #[tokio::test]
    async fn restock_is_visible_after_update() {
        let service = CatalogService::new(InMemoryStore::new());
        let created = service.create_product(lamp(0)).await.unwrap();
        assert!(!created.in_stock());

        let updated = service
            .update_product(
                created.id_typed(),
                ProductPatch {
                    stock: Some(12),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock(), 12);
        assert_eq!(service.product(created.id_typed()).await.unwrap().stock(), 12);
    }

    #[tokio::test]
    async fn invalid_patch_leaves_product_unchanged() {
        let service = CatalogService::new(InMemoryStore::new());
        let created = service.create_product(lamp(3)).await.unwrap();

        let err = service
            .update_product(
                created.id_typed(),
                ProductPatch {
                    stock: Some(9),
                    rating: Some(Decimal::new(7, 0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "got {err:?}");
        assert_eq!(service.product(created.id_typed()).await.unwrap().stock(), 3);
    }

    #[tokio::test]
    async fn oversized_restock_is_a_validation_error() {
        let service = CatalogService::new(InMemoryStore::new());
        let created = service.create_product(lamp(3)).await.unwrap();

        let err = service
            .update_product(
                created.id_typed(),
                ProductPatch {
                    stock: Some(shopfront_catalog::MAX_STOCK + 1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "got {err:?}");
        assert!(!err.is_retryable());
        assert_eq!(service.product(created.id_typed()).await.unwrap().stock(), 3);
    }

    #[tokio::test]
    async fn missing_products_are_not_found() {
        let service = CatalogService::new(InMemoryStore::new());
        let id = ProductId::new();
        assert!(matches!(service.product(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete_product(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service
                .update_product(id, ProductPatch { stock: Some(1), ..Default::default() })
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let service = CatalogService::new(InMemoryStore::new());
        let mut input = lamp(1);
        input.name = "  ".to_string();
        assert!(matches!(
            service.create_product(input).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(service.products(None).await.unwrap().is_empty());
    }
}
