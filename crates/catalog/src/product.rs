use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopfront_core::{DomainError, DomainResult, Entity, ProductId};

/// Upper bound for the customer rating shown on product pages.
const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Largest stock level a product may hold. Matches the range of the
/// persisted `INTEGER` column.
pub const MAX_STOCK: u32 = i32::MAX as u32;

/// Largest review count a product may hold; same column range as stock.
pub const MAX_REVIEWS: u32 = i32::MAX as u32;

/// Failure of the stock-decrement rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("quantity must be positive")]
    ZeroQuantity,

    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient { requested: u32, available: u32 },
}

/// Entity: Product.
///
/// `stock` is unsigned, so the "never negative" invariant holds by
/// construction; the only way to lower it is [`Product::decrement_stock`],
/// which refuses to go below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    image: String,
    images: Vec<String>,
    category: String,
    stock: u32,
    specifications: BTreeMap<String, String>,
    rating: Decimal,
    reviews: u32,
    badge: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Input for creating a product (admin catalog write).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: String,
    pub images: Vec<String>,
    pub category: String,
    pub stock: u32,
    pub specifications: BTreeMap<String, String>,
    pub badge: Option<String>,
}

/// Partial update of a product. `None` leaves the field untouched.
///
/// `badge: Some(String::new())` clears the badge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub rating: Option<Decimal>,
    pub reviews: Option<u32>,
    pub badge: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Flat persisted form of a [`Product`].
///
/// Stores rebuild products from records they wrote themselves, so no
/// validation happens on the way back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: String,
    pub images: Vec<String>,
    pub category: String,
    pub stock: u32,
    pub specifications: BTreeMap<String, String>,
    pub rating: Decimal,
    pub reviews: u32,
    pub badge: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate input and build a new product with no rating or reviews yet.
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        ensure_text("name", &input.name)?;
        ensure_text("description", &input.description)?;
        ensure_text("category", &input.category)?;
        ensure_price(input.price)?;
        ensure_at_most("stock", input.stock, MAX_STOCK)?;

        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            image: input.image,
            images: input.images,
            category: input.category.trim().to_string(),
            stock: input.stock,
            specifications: input.specifications,
            rating: Decimal::ZERO,
            reviews: 0,
            badge: normalize_badge(input.badge),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    /// Derived availability flag; never stored.
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn specifications(&self) -> &BTreeMap<String, String> {
        &self.specifications
    }

    pub fn rating(&self) -> Decimal {
        self.rating
    }

    pub fn reviews(&self) -> u32 {
        self.reviews
    }

    pub fn badge(&self) -> Option<&str> {
        self.badge.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Remove `quantity` units from stock.
    ///
    /// Leaves the product untouched on error.
    pub fn decrement_stock(&mut self, quantity: u32) -> Result<(), StockError> {
        if quantity == 0 {
            return Err(StockError::ZeroQuantity);
        }
        if self.stock < quantity {
            return Err(StockError::Insufficient {
                requested: quantity,
                available: self.stock,
            });
        }
        self.stock -= quantity;
        Ok(())
    }

    /// Apply an admin patch. Every field is validated before anything changes.
    pub fn apply_patch(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if patch.is_empty() {
            return Err(DomainError::validation("patch contains no changes"));
        }
        if let Some(name) = &patch.name {
            ensure_text("name", name)?;
        }
        if let Some(description) = &patch.description {
            ensure_text("description", description)?;
        }
        if let Some(category) = &patch.category {
            ensure_text("category", category)?;
        }
        if let Some(price) = patch.price {
            ensure_price(price)?;
        }
        if let Some(rating) = patch.rating {
            if rating.is_sign_negative() || rating > MAX_RATING {
                return Err(DomainError::validation("rating must be between 0 and 5"));
            }
        }
        if let Some(stock) = patch.stock {
            ensure_at_most("stock", stock, MAX_STOCK)?;
        }
        if let Some(reviews) = patch.reviews {
            ensure_at_most("reviews", reviews, MAX_REVIEWS)?;
        }

        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(category) = patch.category {
            self.category = category.trim().to_string();
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(specifications) = patch.specifications {
            self.specifications = specifications;
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(reviews) = patch.reviews {
            self.reviews = reviews;
        }
        if patch.badge.is_some() {
            self.badge = normalize_badge(patch.badge);
        }

        self.updated_at = now;
        Ok(())
    }

    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            image: self.image.clone(),
            images: self.images.clone(),
            category: self.category.clone(),
            stock: self.stock,
            specifications: self.specifications.clone(),
            rating: self.rating,
            reviews: self.reviews,
            badge: self.badge.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            image: r.image,
            images: r.images,
            category: r.category,
            stock: r.stock,
            specifications: r.specifications,
            rating: r.rating,
            reviews: r.reviews,
            badge: r.badge,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn ensure_text(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn ensure_price(price: Decimal) -> DomainResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}

fn ensure_at_most(field: &str, value: u32, max: u32) -> DomainResult<()> {
    if value > max {
        return Err(DomainError::validation(format!("{field} cannot exceed {max}")));
    }
    Ok(())
}

fn normalize_badge(badge: Option<String>) -> Option<String> {
    badge
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
}
