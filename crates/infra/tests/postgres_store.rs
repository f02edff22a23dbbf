//! Store contract against a live Postgres.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p shopfront-infra -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use shopfront_catalog::{NewProduct, Product};
use shopfront_core::{ProductId, UserId};
use shopfront_infra::store::{InventoryLedger, OrderFilter, PostgresStore, Store, StoreError, StoreTransaction};
use shopfront_infra::{OrderCoordinator, OrderError};
use shopfront_orders::{OrderLineItem, PlaceOrder, ShippingAddress};

async fn store() -> PostgresStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for Postgres tests");
    let store = PostgresStore::connect(&url, 5, Duration::from_millis(500))
        .await
        .expect("connect");
    store.ensure_schema().await.expect("schema");
    store
}

async fn seed(store: &PostgresStore, stock: u32) -> Product {
    let product = Product::create(
        ProductId::new(),
        NewProduct {
            name: "Postgres Mug".to_string(),
            description: "Holds coffee".to_string(),
            price: Decimal::new(1250, 2),
            image: "mug.jpg".to_string(),
            images: vec!["mug-side.jpg".to_string()],
            category: "Kitchen".to_string(),
            stock,
            specifications: [("material".to_string(), "ceramic".to_string())].into(),
            badge: Some("Sale".to_string()),
        },
        Utc::now(),
    )
    .unwrap();
    let mut tx = store.begin().await.unwrap();
    tx.insert_product(product.clone()).await.unwrap();
    tx.commit().await.unwrap();
    product
}

fn cart(product: &Product, quantity: u32) -> PlaceOrder {
    let item = OrderLineItem {
        product_id: product.id_typed(),
        name: product.name().to_string(),
        price: product.price(),
        quantity,
        image: product.image().to_string(),
    };
    PlaceOrder {
        user_id: UserId::new(format!("pg-{}", ProductId::new())).unwrap(),
        total: item.subtotal().unwrap(),
        items: vec![item],
        shipping_address: ShippingAddress {
            name: "Grace Hopper".to_string(),
            street: "1 Compiler Way".to_string(),
            city: "Arlington".to_string(),
            zip: "22201".to_string(),
            country: "US".to_string(),
            phone: Some("+1 555 0100".to_string()),
        },
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn products_round_trip_through_postgres() {
    let store = store().await;
    let product = seed(&store, 3).await;
    let loaded = store.product(product.id_typed()).await.unwrap().unwrap();
    assert_eq!(loaded.to_record().specifications, product.to_record().specifications);
    assert_eq!(loaded.price(), product.price());
    assert_eq!(loaded.stock(), 3);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn order_and_decrement_commit_together() {
    let store = store().await;
    let product = seed(&store, 5).await;
    let coordinator = OrderCoordinator::new(store.clone());
    let cmd = cart(&product, 2);
    let user = cmd.user_id.clone();

    let order = coordinator.place_order(cmd).await.unwrap();
    assert_eq!(store.product(product.id_typed()).await.unwrap().unwrap().stock(), 3);

    let mine = store.orders(OrderFilter::for_user(user)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id_typed(), order.id_typed());
    assert_eq!(mine[0].items(), order.items());
    assert_eq!(mine[0].shipping_address(), order.shipping_address());

    let err = coordinator.place_order(cart(&product, 4)).await.unwrap_err();
    assert!(matches!(err, OrderError::InsufficientStock { available: 3, .. }));
    assert_eq!(store.product(product.id_typed()).await.unwrap().unwrap().stock(), 3);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn lock_timeout_maps_to_conflict() {
    let store = Arc::new(store().await);
    let product = seed(&store, 5).await;

    let mut holder = store.begin().await.unwrap();
    holder.get_for_update(product.id_typed()).await.unwrap();

    let mut waiter = store.begin().await.unwrap();
    let err = waiter.get_for_update(product.id_typed()).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");

    holder.rollback().await.unwrap();
}
