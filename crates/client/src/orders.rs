//! Order history reads.
//!
//! Orders are created through checkout; this client only lists and displays
//! them. Status transitions happen on the backend and are never issued from
//! here.

use tracing::instrument;

use shoppy_core::OrderId;

use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{Order, OrderSummary};

/// Client for the authenticated user's order history.
#[derive(Clone)]
pub struct OrdersClient {
    transport: Transport,
}

impl OrdersClient {
    /// Create an orders client over the given transport.
    #[must_use]
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// List the user's orders, newest first as the backend sends them.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<OrderSummary>, ApiError> {
        self.transport.get("/orders").await
    }

    /// Get one order with its lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the API request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn order(&self, order_id: OrderId) -> Result<Order, ApiError> {
        self.transport.get(&format!("/orders/{order_id}")).await
    }
}
