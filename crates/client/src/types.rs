//! Domain types for the Shoppy backend REST surface.
//!
//! These mirror the backend's response shapes. Timestamps arrive as naive
//! UTC datetimes (no offset suffix), so `NaiveDateTime` is used throughout.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoppy_core::{CartItemId, OrderId, OrderStatus, PaymentStatus, ProductId, ReviewId, UserId};

// =============================================================================
// Identity
// =============================================================================

/// The authenticated user, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

impl Identity {
    /// Name to show for this user: full name when set, email otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

// =============================================================================
// Products
// =============================================================================

/// A catalog product. Read-only from the client's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: i64,
    pub created_at: NaiveDateTime,
}

/// One entry of the fixed category list (`GET /products/categories`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
}

// =============================================================================
// Cart
// =============================================================================

/// Product snapshot embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineProduct {
    pub id: ProductId,
    pub name: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub quantity: i64,
    pub product: CartLineProduct,
}

impl CartLine {
    /// Line total (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Aggregate cart view, recomputed authoritatively by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub total_quantity: i64,
    pub total_amount: Decimal,
}

impl CartSummary {
    /// The zero summary shown while anonymous or when a refresh fails.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_quantity: 0,
            total_amount: Decimal::ZERO,
        }
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for CartSummary {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// A product review. At most one per (product, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

// =============================================================================
// Orders
// =============================================================================

/// The non-sensitive subset of entered payment fields actually transmitted.
///
/// The full card number and the CVV never leave the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDescriptor {
    pub cardholder_name: String,
    pub card_last4: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub shipping_customer_name: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_phone: Option<String>,
    pub shipping_email: Option<String>,
    pub payment: PaymentDescriptor,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product: CartLineProduct,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// A placed order with its lines (`GET /orders/{id}`, `POST /orders`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub shipping_customer_name: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_phone: Option<String>,
    pub shipping_email: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub items: Vec<OrderItem>,
}

/// Order list entry (`GET /orders`), without line detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub shipping_customer_name: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_phone: Option<String>,
    pub shipping_email: Option<String>,
    pub created_at: NaiveDateTime,
}
