use std::collections::BTreeMap;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;

use shopfront_catalog::{NewProduct, Product, ProductPatch};
use shopfront_core::{ProductId, UserId};
use shopfront_orders::{Order, OrderLineItem, OrderStatus, PlaceOrder, ShippingAddress};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShippingAddressRequest {
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
    pub country: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// Optional; must match the token subject unless the caller is an admin.
    pub user_id: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub shipping_address: ShippingAddressRequest,
    pub total: Decimal,
}

impl PlaceOrderRequest {
    /// Turn the wire shape into a command. Id and quantity conversions fail
    /// here; the rest of the validation belongs to the command itself.
    pub fn into_command(self, user_id: UserId) -> Result<PlaceOrder, axum::response::Response> {
        let mut items = Vec::with_capacity(self.items.len());
        for (idx, item) in self.items.into_iter().enumerate() {
            let product_id: ProductId = item.product_id.parse().map_err(|_| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("item {idx}: invalid product id"),
                )
            })?;
            let quantity = positive_u32(item.quantity)
                .map_err(|reason| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("item {idx}: quantity {reason}")))?;
            items.push(OrderLineItem {
                product_id,
                name: item.name,
                price: item.price,
                quantity,
                image: item.image,
            });
        }

        let address = self.shipping_address;
        Ok(PlaceOrder {
            user_id,
            items,
            shipping_address: ShippingAddress {
                name: address.name,
                street: address.street,
                city: address.city,
                zip: address.zip,
                country: address.country,
                phone: address.phone.filter(|p| !p.trim().is_empty()),
            },
            total: self.total,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub tracking_number: Option<String>,
}

impl UpdateOrderStatusRequest {
    pub fn status(&self) -> Result<OrderStatus, axum::response::Response> {
        self.status
            .parse()
            .map_err(|e: shopfront_core::DomainError| errors::json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    pub badge: Option<String>,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> Result<NewProduct, axum::response::Response> {
        let stock = non_negative_u32(self.stock).map_err(|reason| {
            errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("stock {reason}"))
        })?;
        Ok(NewProduct {
            name: self.name,
            description: self.description,
            price: self.price,
            image: self.image,
            images: self.images,
            category: self.category,
            stock,
            specifications: self.specifications,
            badge: self.badge.filter(|b| !b.trim().is_empty()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub stock: Option<i64>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub rating: Option<Decimal>,
    pub reviews: Option<i64>,
    pub badge: Option<String>,
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> Result<ProductPatch, axum::response::Response> {
        let invalid = |field: &str, reason: &str| {
            errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("{field} {reason}"))
        };
        let stock = self
            .stock
            .map(non_negative_u32)
            .transpose()
            .map_err(|reason| invalid("stock", reason))?;
        let reviews = self
            .reviews
            .map(non_negative_u32)
            .transpose()
            .map_err(|reason| invalid("reviews", reason))?;
        Ok(ProductPatch {
            name: self.name,
            description: self.description,
            price: self.price,
            image: self.image,
            images: self.images,
            category: self.category,
            stock,
            specifications: self.specifications,
            rating: self.rating,
            reviews,
            badge: self.badge,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

fn positive_u32(value: i64) -> Result<u32, &'static str> {
    if value <= 0 {
        return Err("must be positive");
    }
    u32::try_from(value).map_err(|_| "is too large")
}

fn non_negative_u32(value: i64) -> Result<u32, &'static str> {
    if value < 0 {
        return Err("cannot be negative");
    }
    u32::try_from(value).map_err(|_| "is too large")
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id_typed().to_string(),
        "name": p.name(),
        "description": p.description(),
        "price": p.price(),
        "image": p.image(),
        "images": p.images(),
        "category": p.category(),
        "stock": p.stock(),
        "inStock": p.in_stock(),
        "specifications": p.specifications(),
        "rating": p.rating(),
        "reviews": p.reviews(),
        "badge": p.badge(),
        "createdAt": p.created_at().to_rfc3339(),
        "updatedAt": p.updated_at().to_rfc3339(),
    })
}

pub fn order_to_json(o: &Order) -> serde_json::Value {
    serde_json::json!({
        "id": o.id_typed().to_string(),
        "userId": o.user_id().as_str(),
        "items": o.items(),
        "total": o.total(),
        "status": o.status().as_str(),
        "paymentStatus": o.payment_status().as_str(),
        "shippingAddress": o.shipping_address(),
        "transactionId": o.transaction_id(),
        "trackingNumber": o.tracking_number(),
        "createdAt": o.created_at().to_rfc3339(),
        "updatedAt": o.updated_at().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok<T>(result: Result<T, axum::response::Response>) -> T {
        match result {
            Ok(value) => value,
            Err(resp) => panic!("unexpected error response: {}", resp.status()),
        }
    }

    fn request(quantity: i64, product_id: &str) -> PlaceOrderRequest {
        serde_json::from_value(serde_json::json!({
            "items": [{
                "productId": product_id,
                "name": "Lamp",
                "price": 12.5,
                "quantity": quantity,
                "image": "lamp.jpg"
            }],
            "shippingAddress": {
                "name": "Ada", "street": "1 Row", "city": "London", "zip": "N1", "country": "UK", "phone": ""
            },
            "total": 25
        }))
        .unwrap()
    }

    #[test]
    fn request_maps_to_command() {
        let id = ProductId::new();
        let cmd = ok(request(2, &id.to_string()).into_command(UserId::new("u1").unwrap()));
        assert_eq!(cmd.items[0].product_id, id);
        assert_eq!(cmd.items[0].quantity, 2);
        assert_eq!(cmd.items[0].price, Decimal::new(125, 1));
        assert_eq!(cmd.total, Decimal::new(25, 0));
        assert_eq!(cmd.shipping_address.phone, None);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let id = ProductId::new().to_string();
        assert!(request(0, &id).into_command(UserId::new("u1").unwrap()).is_err());
        assert!(request(-3, &id).into_command(UserId::new("u1").unwrap()).is_err());
    }

    #[test]
    fn malformed_product_id_is_rejected() {
        assert!(request(1, "nope").into_command(UserId::new("u1").unwrap()).is_err());
    }

    #[test]
    fn negative_stock_patch_is_rejected() {
        let patch = UpdateProductRequest {
            stock: Some(-1),
            ..Default::default()
        };
        assert!(patch.into_patch().is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let body = UpdateOrderStatusRequest {
            status: "lost".to_string(),
            tracking_number: None,
        };
        assert!(body.status().is_err());
        let shipped = UpdateOrderStatusRequest {
            status: "Shipped".to_string(),
            tracking_number: None,
        };
        assert_eq!(ok(shipped.status()), OrderStatus::Shipped);
    }
}
