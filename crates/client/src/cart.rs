//! Cart synchronizer: single source of truth for "how many items are in the
//! cart" across any number of independent observers.
//!
//! The backend owns the real cart; this component owns a cached
//! [`CartSummary`] and an invalidation broadcast. A mutation issues the
//! backend write, re-fetches the summary, then broadcasts a payload-free
//! signal; every mounted cart-count display re-fetches independently. The
//! signal is a re-fetch hint, not a delta - it carries no ordering
//! guarantee relative to other broadcasts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use shoppy_core::{CartItemId, ProductId};

use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::CartSummary;

/// Capacity of the invalidation channel. Observers that fall behind see a
/// lagged receive, which still reads as "re-fetch".
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Errors that can occur during cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity below the allowed range; rejected before any request.
    #[error("quantity cannot be negative")]
    NegativeQuantity,

    /// `add_item` requires at least one unit.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// Another mutation for this line is still in flight.
    #[error("cart line {0} has an update in flight")]
    LineBusy(CartItemId),

    /// Backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CartError {
    /// One display string for the invoking view.
    #[must_use]
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(err) => err.display_message(fallback),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct AddItemRequest {
    product_id: ProductId,
    quantity: i64,
}

#[derive(Serialize)]
struct UpdateQuantityRequest {
    quantity: i64,
}

/// Observer handle for the cart invalidation broadcast.
pub struct CartWatcher {
    receiver: broadcast::Receiver<()>,
}

impl CartWatcher {
    /// Wait for the next invalidation signal.
    ///
    /// Returns `false` once the synchronizer is gone and no further signals
    /// can arrive. A lagged receiver still returns `true`: the signal is a
    /// hint to re-fetch, so missed signals collapse into one.
    pub async fn changed(&mut self) -> bool {
        match self.receiver.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => true,
            Err(broadcast::error::RecvError::Closed) => false,
        }
    }
}

/// Owner of the shared cart summary cache and its invalidation channel.
///
/// Cheap to clone; all clones share the cache, the busy set, and the
/// broadcast channel.
#[derive(Clone)]
pub struct CartSynchronizer {
    inner: Arc<CartInner>,
}

struct CartInner {
    transport: Transport,
    summary: RwLock<CartSummary>,
    busy: Mutex<HashSet<CartItemId>>,
    events: broadcast::Sender<()>,
}

/// Removes the line from the busy set when the mutation settles.
struct LineGuard<'a> {
    busy: &'a Mutex<HashSet<CartItemId>>,
    id: CartItemId,
}

impl Drop for LineGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut busy) = self.busy.lock() {
            busy.remove(&self.id);
        }
    }
}

impl CartSynchronizer {
    /// Create a cart synchronizer over the given transport.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CartInner {
                transport,
                summary: RwLock::new(CartSummary::empty()),
                busy: Mutex::new(HashSet::new()),
                events,
            }),
        }
    }

    /// The cached summary, as of the last refresh.
    pub async fn summary(&self) -> CartSummary {
        self.inner.summary.read().await.clone()
    }

    /// Subscribe to the invalidation broadcast.
    #[must_use]
    pub fn subscribe(&self) -> CartWatcher {
        CartWatcher {
            receiver: self.inner.events.subscribe(),
        }
    }

    /// Whether a mutation for this line is currently in flight. Views use
    /// this to disable the controls of that line only.
    #[must_use]
    pub fn is_line_busy(&self, id: CartItemId) -> bool {
        self.inner
            .busy
            .lock()
            .map(|busy| busy.contains(&id))
            .unwrap_or(false)
    }

    /// Re-fetch the cart summary from the backend.
    ///
    /// Any failure - including an anonymous session - resolves to the zero
    /// summary rather than an error: the cart badge must never hard-fail
    /// the page.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> CartSummary {
        let summary = match self.inner.transport.get::<CartSummary>("/cart").await {
            Ok(summary) => summary,
            Err(err) => {
                debug!(error = %err, "Cart refresh failed, showing empty cart");
                CartSummary::empty()
            }
        };

        *self.inner.summary.write().await = summary.clone();
        summary
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ZeroQuantity`/`NegativeQuantity` before any
    /// request is issued, or the backend rejection.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartSummary, CartError> {
        if quantity < 0 {
            return Err(CartError::NegativeQuantity);
        }
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let _: serde_json::Value = self
            .inner
            .transport
            .post(
                "/cart/items",
                &AddItemRequest {
                    product_id,
                    quantity,
                },
            )
            .await?;

        Ok(self.settle().await)
    }

    /// Set the quantity of a cart line.
    ///
    /// Quantity 0 is defined identically to [`Self::remove_item`]. Negative
    /// quantities are rejected before any request is issued.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineBusy` while another mutation for the same
    /// line is in flight, or the backend rejection.
    #[instrument(skip(self), fields(line_id = %line_id, quantity))]
    pub async fn set_quantity(
        &self,
        line_id: CartItemId,
        quantity: i64,
    ) -> Result<CartSummary, CartError> {
        if quantity < 0 {
            return Err(CartError::NegativeQuantity);
        }
        if quantity == 0 {
            return self.remove_item(line_id).await;
        }

        let _guard = self.acquire_line(line_id)?;

        let _: serde_json::Value = self
            .inner
            .transport
            .patch(
                &format!("/cart/items/{line_id}"),
                &UpdateQuantityRequest { quantity },
            )
            .await?;

        Ok(self.settle().await)
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineBusy` while another mutation for the same
    /// line is in flight, or the backend rejection.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&self, line_id: CartItemId) -> Result<CartSummary, CartError> {
        let _guard = self.acquire_line(line_id)?;

        self.inner
            .transport
            .delete(&format!("/cart/items/{line_id}"))
            .await?;

        Ok(self.settle().await)
    }

    /// Broadcast the invalidation signal without mutating anything.
    ///
    /// Used by collaborators whose success makes the cached cart stale
    /// (order placement).
    pub fn notify_changed(&self) {
        // Fire-and-forget: no receivers is fine.
        if self.inner.events.send(()).is_err() {
            debug!("Cart invalidation broadcast has no observers");
        }
    }

    /// Mark a line in flight, rejecting overlap on the same line.
    fn acquire_line(&self, id: CartItemId) -> Result<LineGuard<'_>, CartError> {
        let mut busy = self
            .inner
            .busy
            .lock()
            .map_err(|_| CartError::LineBusy(id))?;
        if !busy.insert(id) {
            warn!(line_id = %id, "Rejected overlapping mutation for cart line");
            return Err(CartError::LineBusy(id));
        }
        Ok(LineGuard {
            busy: &self.inner.busy,
            id,
        })
    }

    /// Re-fetch after a successful write, then broadcast. The broadcast
    /// happens strictly after the mutating request's success.
    async fn settle(&self) -> CartSummary {
        let summary = self.refresh().await;
        self.notify_changed();
        summary
    }
}
