//! Postgres-backed store implementation.
//!
//! Products are plain rows; orders keep their line items and shipping address
//! as JSONB documents on the order row. Row locks come from
//! `SELECT ... FOR UPDATE`, bounded per transaction with `SET LOCAL lock_timeout`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (serialization failure) | `40001` | `Conflict` | Concurrent transaction won |
//! | Database (deadlock detected) | `40P01` | `Conflict` | Lock cycle between two carts |
//! | Database (lock not available) | `55P03` | `Conflict` | `lock_timeout` elapsed |
//! | Database (check violation) | `23514` | `Conflict` | `stock >= 0` guard fired |
//! | Database (unique violation) | `23505` | `Duplicate` | Insert of an existing id |
//! | Database (other) | Any other | `Unavailable` | Other database errors |
//! | PoolTimedOut / PoolClosed / Io / Tls | N/A | `Unavailable` | Connectivity |
//! | ColumnDecode / Decode | N/A | `Decode` | Row no longer matches the model |

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;

use shopfront_catalog::{Product, ProductRecord};
use shopfront_core::{OrderId, ProductId, UserId};
use shopfront_orders::{Order, OrderLineItem, OrderRecord, ShippingAddress};

use super::r#trait::{InventoryLedger, OrderFilter, Store, StoreError, StoreTransaction};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id              UUID PRIMARY KEY,
        name            TEXT NOT NULL,
        description     TEXT NOT NULL,
        price           NUMERIC NOT NULL CHECK (price >= 0),
        image           TEXT NOT NULL,
        images          JSONB NOT NULL DEFAULT '[]'::jsonb,
        category        TEXT NOT NULL,
        stock           INTEGER NOT NULL CHECK (stock >= 0),
        specifications  JSONB NOT NULL DEFAULT '{}'::jsonb,
        rating          NUMERIC NOT NULL DEFAULT 0,
        reviews         INTEGER NOT NULL DEFAULT 0 CHECK (reviews >= 0),
        badge           TEXT,
        created_at      TIMESTAMPTZ NOT NULL,
        updated_at      TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS products_category_idx ON products (lower(category))",
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id                UUID PRIMARY KEY,
        user_id           TEXT NOT NULL,
        items             JSONB NOT NULL,
        total             NUMERIC NOT NULL CHECK (total >= 0),
        status            TEXT NOT NULL,
        payment_status    TEXT NOT NULL,
        shipping_address  JSONB NOT NULL,
        transaction_id    TEXT,
        tracking_number   TEXT,
        created_at        TIMESTAMPTZ NOT NULL,
        updated_at        TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS orders_user_created_idx ON orders (user_id, created_at DESC)",
];

const PRODUCT_COLUMNS: &str = "id, name, description, price, image, images, category, stock, \
     specifications, rating, reviews, badge, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, items, total, status, payment_status, shipping_address, \
     transaction_id, tracking_number, created_at, updated_at";

/// Postgres-backed transactional store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Open a pool against `database_url`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, lock_timeout))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they are missing. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        // SET does not take bind parameters; the value is an integer we own.
        let set_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        Ok(PostgresTransaction { tx })
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::text IS NULL OR lower(category) = lower($1)) \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::text IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.user_id.as_ref().map(UserId::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders", e))?;
        rows.iter().map(order_from_row).collect()
    }
}

/// Transaction over [`PostgresStore`].
///
/// Dropping it without commit lets sqlx roll the transaction back when the
/// connection returns to the pool.
#[derive(Debug)]
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    async fn upsert_product(&mut self, product: &Product, operation: &str) -> Result<(), StoreError> {
        let r = product.to_record();
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price, image, images, category, stock,
                specifications, rating, reviews, badge, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                image = EXCLUDED.image,
                images = EXCLUDED.images,
                category = EXCLUDED.category,
                stock = EXCLUDED.stock,
                specifications = EXCLUDED.specifications,
                rating = EXCLUDED.rating,
                reviews = EXCLUDED.reviews,
                badge = EXCLUDED.badge,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(r.id.as_uuid())
        .bind(&r.name)
        .bind(&r.description)
        .bind(r.price)
        .bind(&r.image)
        .bind(Json(&r.images))
        .bind(&r.category)
        .bind(to_i32("stock", r.stock)?)
        .bind(Json(&r.specifications))
        .bind(r.rating)
        .bind(to_i32("reviews", r.reviews)?)
        .bind(&r.badge)
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }

    async fn write_order(&mut self, order: &Order, operation: &str, insert: bool) -> Result<(), StoreError> {
        let r = order.to_record();
        let sql = if insert {
            r#"
            INSERT INTO orders (
                id, user_id, items, total, status, payment_status, shipping_address,
                transaction_id, tracking_number, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#
        } else {
            r#"
            UPDATE orders SET
                user_id = $2, items = $3, total = $4, status = $5, payment_status = $6,
                shipping_address = $7, transaction_id = $8, tracking_number = $9,
                created_at = $10, updated_at = $11
            WHERE id = $1
            "#
        };
        sqlx::query(sql)
            .bind(r.id.as_uuid())
            .bind(r.user_id.as_str())
            .bind(Json(&r.items))
            .bind(r.total)
            .bind(r.status.as_str())
            .bind(r.payment_status.as_str())
            .bind(Json(&r.shipping_address))
            .bind(&r.transaction_id)
            .bind(&r.tracking_number)
            .bind(r.created_at)
            .bind(r.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }
}

#[async_trait]
impl InventoryLedger for PostgresTransaction {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_for_update", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed(), stock = product.stock()), err)]
    async fn save(&mut self, product: Product) -> Result<(), StoreError> {
        self.upsert_product(&product, "save").await
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn insert_product(&mut self, product: Product) -> Result<(), StoreError> {
        let r = product.to_record();
        let exists = sqlx::query("SELECT 1 FROM products WHERE id = $1 FOR UPDATE")
            .bind(r.id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        if exists.is_some() {
            return Err(StoreError::Duplicate(format!("product {} already exists", r.id)));
        }
        self.upsert_product(&product, "insert_product").await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&mut self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_for_update", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn insert_order(&mut self, order: Order) -> Result<(), StoreError> {
        self.write_order(&order, "insert_order", true).await
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn save_order(&mut self, order: Order) -> Result<(), StoreError> {
        self.write_order(&order, "save_order", false).await
    }

    #[instrument(skip(self), err)]
    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    #[instrument(skip(self), err)]
    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Decode(format!("product row: {e}"));

    let images: Json<Vec<String>> = row.try_get("images").map_err(decode)?;
    let specifications: Json<BTreeMap<String, String>> =
        row.try_get("specifications").map_err(decode)?;
    let stock: i32 = row.try_get("stock").map_err(decode)?;
    let reviews: i32 = row.try_get("reviews").map_err(decode)?;

    let record = ProductRecord {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        price: row.try_get::<Decimal, _>("price").map_err(decode)?,
        image: row.try_get("image").map_err(decode)?,
        images: images.0,
        category: row.try_get("category").map_err(decode)?,
        stock: from_i32("stock", stock)?,
        specifications: specifications.0,
        rating: row.try_get::<Decimal, _>("rating").map_err(decode)?,
        reviews: from_i32("reviews", reviews)?,
        badge: row.try_get("badge").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    };
    Ok(Product::from(record))
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Decode(format!("order row: {e}"));

    let user_id: String = row.try_get("user_id").map_err(decode)?;
    let items: Json<Vec<OrderLineItem>> = row.try_get("items").map_err(decode)?;
    let shipping_address: Json<ShippingAddress> = row.try_get("shipping_address").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let payment_status: String = row.try_get("payment_status").map_err(decode)?;

    let record = OrderRecord {
        id: OrderId::from_uuid(row.try_get("id").map_err(decode)?),
        user_id: UserId::new(user_id).map_err(|e| StoreError::Decode(e.to_string()))?,
        items: items.0,
        total: row.try_get::<Decimal, _>("total").map_err(decode)?,
        status: status.parse().map_err(|e: shopfront_core::DomainError| StoreError::Decode(e.to_string()))?,
        payment_status: payment_status
            .parse()
            .map_err(|e: shopfront_core::DomainError| StoreError::Decode(e.to_string()))?,
        shipping_address: shipping_address.0,
        transaction_id: row.try_get("transaction_id").map_err(decode)?,
        tracking_number: row.try_get("tracking_number").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    };
    Ok(Order::from(record))
}

fn to_i32(field: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Decode(format!("{field} {value} exceeds column range")))
}

fn from_i32(field: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{field} is negative: {value}")))
}

/// Map SQLx errors to StoreError by SQLSTATE.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") | Some("55P03") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Conflict(msg),
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{} in {}", err, operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("timed out acquiring a connection in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
