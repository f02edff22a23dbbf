use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::{DomainError, DomainResult, Entity, OrderId, ProductId, UserId, ValueObject};

/// Order fulfilment lifecycle.
///
/// Orders are always created `Pending`; every later transition is an
/// out-of-band admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(DomainError::validation(
                "status must be one of: pending, processing, shipped, delivered, cancelled",
            )),
        }
    }
}

/// Payment state. Payment itself is handled elsewhere; orders start `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(DomainError::validation(
                "payment status must be one of: pending, paid, failed",
            )),
        }
    }
}

/// Delivery address, opaque to order placement beyond presence checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ValueObject for ShippingAddress {}

impl ShippingAddress {
    fn validate(&self) -> DomainResult<()> {
        let required = [
            ("name", &self.name),
            ("street", &self.street),
            ("city", &self.city),
            ("zip", &self.zip),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "shipping address {field} is required"
                )));
            }
        }
        Ok(())
    }
}

/// One product + quantity in an order.
///
/// `name`, `price` and `image` are a snapshot taken from the submitted cart;
/// later edits to the product never reach a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image: String,
}

impl ValueObject for OrderLineItem {}

impl OrderLineItem {
    /// `price × quantity`, or `None` if it does not fit in a `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Command input: place an order for a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub items: Vec<OrderLineItem>,
    pub shipping_address: ShippingAddress,
    pub total: Decimal,
}

impl PlaceOrder {
    /// Structural validation. Runs before any store access.
    pub fn validate(&self) -> DomainResult<()> {
        if self.user_id.as_str().trim().is_empty() {
            return Err(DomainError::validation("user id is required"));
        }
        if self.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        for (idx, item) in self.items.iter().enumerate() {
            if item.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "item {idx}: quantity must be positive"
                )));
            }
            if item.price.is_sign_negative() && !item.price.is_zero() {
                return Err(DomainError::validation(format!(
                    "item {idx}: price cannot be negative"
                )));
            }
        }
        if self.total.is_sign_negative() && !self.total.is_zero() {
            return Err(DomainError::validation("total cannot be negative"));
        }
        self.shipping_address.validate()
    }

    /// Sum of line subtotals, or `None` on overflow. Informational only: the
    /// stored total is the one the caller submitted.
    pub fn computed_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.subtotal()?))
    }
}

/// Entity: Order.
///
/// Immutable once committed, except for `status`/`tracking_number`, which
/// belong to the admin fulfilment workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderLineItem>,
    total: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    shipping_address: ShippingAddress,
    transaction_id: Option<String>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Flat persisted form of an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderLineItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: ShippingAddress,
    pub transaction_id: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build the order record for a validated cart.
    ///
    /// Pure: line items are copied verbatim in submission order, the total is
    /// taken as given and both statuses start at `pending`.
    pub fn assemble(id: OrderId, cmd: &PlaceOrder, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: cmd.user_id.clone(),
            items: cmd.items.clone(),
            total: cmd.total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address: cmd.shipping_address.clone(),
            transaction_id: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Admin status change, optionally recording a tracking number.
    pub fn transition(
        &mut self,
        status: OrderStatus,
        tracking_number: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status.is_terminal() && status != self.status {
            return Err(DomainError::invariant(format!(
                "cannot move a {} order to {}",
                self.status, status
            )));
        }

        let tracking_number = tracking_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        self.status = status;
        if tracking_number.is_some() {
            self.tracking_number = tracking_number;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            user_id: self.user_id.clone(),
            items: self.items.clone(),
            total: self.total,
            status: self.status,
            payment_status: self.payment_status,
            shipping_address: self.shipping_address.clone(),
            transaction_id: self.transaction_id.clone(),
            tracking_number: self.tracking_number.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<OrderRecord> for Order {
    fn from(r: OrderRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            items: r.items,
            total: r.total,
            status: r.status,
            payment_status: r.payment_status,
            shipping_address: r.shipping_address,
            transaction_id: r.transaction_id,
            tracking_number: r.tracking_number,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "John Doe".to_string(),
            street: "123 Baker Street".to_string(),
            city: "London".to_string(),
            zip: "NW1 6XE".to_string(),
            country: "United Kingdom".to_string(),
            phone: None,
        }
    }

    fn line(name: &str, price: Decimal, quantity: u32) -> OrderLineItem {
        OrderLineItem {
            product_id: ProductId::new(),
            name: name.to_string(),
            price,
            quantity,
            image: format!("{name}.jpg"),
        }
    }

    fn place_order(items: Vec<OrderLineItem>) -> PlaceOrder {
        let total = items.iter().filter_map(OrderLineItem::subtotal).sum();
        PlaceOrder {
            user_id: UserId::new("user-1").unwrap(),
            items,
            shipping_address: address(),
            total,
        }
    }

    #[test]
    fn assemble_starts_pending_with_snapshot_items() {
        let cmd = place_order(vec![
            line("planner", Decimal::new(2999, 2), 2),
            line("pen", Decimal::new(8500, 2), 1),
        ]);
        let order = Order::assemble(OrderId::new(), &cmd, test_time());

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.items(), cmd.items.as_slice());
        assert_eq!(order.total(), Decimal::new(14498, 2));
        assert_eq!(order.tracking_number(), None);
        assert!(order.is_owned_by(&cmd.user_id));
    }

    #[test]
    fn assemble_keeps_the_submitted_total() {
        let mut cmd = place_order(vec![line("planner", Decimal::new(2999, 2), 1)]);
        cmd.total = Decimal::new(3499, 2);
        let order = Order::assemble(OrderId::new(), &cmd, test_time());
        assert_eq!(order.total(), Decimal::new(3499, 2));
        assert_ne!(Some(order.total()), cmd.computed_total());
    }

    #[test]
    fn computed_total_is_none_on_overflow() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        let single = place_order(vec![line("yacht", huge, 2)]);
        assert_eq!(single.items[0].subtotal(), None);
        assert_eq!(single.computed_total(), None);
        assert!(single.validate().is_ok());

        // Each line fits on its own; only the sum overflows.
        let pair = PlaceOrder {
            items: vec![line("yacht", huge, 1), line("yacht", huge, 1)],
            ..place_order(vec![line("yacht", huge, 1)])
        };
        assert_eq!(pair.items[0].subtotal(), Some(huge));
        assert_eq!(pair.computed_total(), None);
    }

    #[test]
    fn computed_total_sums_line_subtotals() {
        let cmd = place_order(vec![
            line("planner", Decimal::new(2999, 2), 2),
            line("pen", Decimal::new(850, 2), 3),
        ]);
        assert_eq!(cmd.computed_total(), Some(Decimal::new(8548, 2)));
    }

    #[test]
    fn validate_rejects_empty_cart() {
        let err = place_order(vec![]).validate().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("order must contain at least one item")
        );
    }

    #[test]
    fn validate_rejects_zero_quantity() {
        let cmd = place_order(vec![
            line("planner", Decimal::ONE, 1),
            line("pen", Decimal::ONE, 0),
        ]);
        assert_eq!(
            cmd.validate().unwrap_err(),
            DomainError::validation("item 1: quantity must be positive")
        );
    }

    #[test]
    fn validate_rejects_missing_address_fields() {
        let mut cmd = place_order(vec![line("planner", Decimal::ONE, 1)]);
        cmd.shipping_address.zip = " ".to_string();
        assert_eq!(
            cmd.validate().unwrap_err(),
            DomainError::validation("shipping address zip is required")
        );
    }

    #[test]
    fn validate_rejects_negative_total() {
        let mut cmd = place_order(vec![line("planner", Decimal::ONE, 1)]);
        cmd.total = Decimal::NEGATIVE_ONE;
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn transition_records_tracking_number() {
        let cmd = place_order(vec![line("planner", Decimal::ONE, 1)]);
        let mut order = Order::assemble(OrderId::new(), &cmd, test_time());

        order
            .transition(OrderStatus::Shipped, Some(" TRK-123 ".to_string()), test_time())
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.tracking_number(), Some("TRK-123"));

        // A later change without a tracking number keeps the existing one.
        order
            .transition(OrderStatus::Delivered, None, test_time())
            .unwrap();
        assert_eq!(order.tracking_number(), Some("TRK-123"));
    }

    #[test]
    fn terminal_orders_cannot_change_status() {
        let cmd = place_order(vec![line("planner", Decimal::ONE, 1)]);
        let mut order = Order::assemble(OrderId::new(), &cmd, test_time());
        order
            .transition(OrderStatus::Cancelled, None, test_time())
            .unwrap();

        let before = order.clone();
        let err = order
            .transition(OrderStatus::Processing, None, test_time())
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => {
                assert_eq!(msg, "cannot move a cancelled order to processing")
            }
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
        assert_eq!(order, before);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn line_items_use_camel_case_on_the_wire() {
        let item = line("planner", Decimal::new(2999, 2), 2);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productId"], serde_json::json!(item.product_id.to_string()));
        assert_eq!(json["quantity"], serde_json::json!(2));
        assert_eq!(json["price"], serde_json::json!(29.99));
    }

    #[test]
    fn record_round_trip_preserves_order() {
        let cmd = place_order(vec![line("planner", Decimal::ONE, 3)]);
        let order = Order::assemble(OrderId::new(), &cmd, test_time());
        assert_eq!(Order::from(order.to_record()), order);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            /// Property: assembly preserves cart order and snapshot fields exactly.
            #[test]
            fn assemble_preserves_cart_order(
                lines in proptest::collection::vec(
                    ("[a-z]{1,12}", 0i64..100_000, 1u32..50),
                    1..20
                )
            ) {
                let items: Vec<OrderLineItem> = lines
                    .iter()
                    .map(|(name, cents, qty)| line(name, Decimal::new(*cents, 2), *qty))
                    .collect();
                let cmd = place_order(items);
                prop_assert!(cmd.validate().is_ok());

                let order = Order::assemble(OrderId::new(), &cmd, test_time());
                prop_assert_eq!(order.items().len(), cmd.items.len());
                for (stored, submitted) in order.items().iter().zip(cmd.items.iter()) {
                    prop_assert_eq!(stored, submitted);
                }
                prop_assert_eq!(order.status(), OrderStatus::Pending);
            }
        }
    }
}
