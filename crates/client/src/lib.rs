//! Shoppy client - state synchronization for the storefront frontend.
//!
//! This crate keeps authentication session, cart contents, order placement,
//! and per-product review state consistent across independently rendered UI
//! fragments that share no central store. Views talk to small owner
//! components; the components talk to the backend through [`Transport`];
//! cart invalidation fans out over a payload-free broadcast channel.
//!
//! # Components
//!
//! - [`Transport`] - wraps outbound requests, attaches the bearer token,
//!   normalizes HTTP and body-parse failures
//! - [`SessionStore`] - owns the authenticated identity and its lifecycle
//! - [`CartSynchronizer`] - owns the cart summary cache and the
//!   invalidation broadcast
//! - [`ReviewReconciler`] - per-product review collection with the
//!   one-review-per-user invariant
//! - [`CheckoutForm`] / [`CheckoutSubmitter`] - order form validation and
//!   atomic order creation
//! - [`CatalogClient`] / [`OrdersClient`] - read-only product and order
//!   history access
//!
//! # Example
//!
//! ```rust,ignore
//! use shoppy_client::{ClientConfig, Transport, SessionStore, CartSynchronizer};
//!
//! let config = ClientConfig::from_env()?;
//! let transport = Transport::new(&config)?;
//!
//! let session = SessionStore::new(transport.clone());
//! session.bootstrap().await;
//! session.login("user@example.com", "hunter2!A").await?;
//!
//! let cart = CartSynchronizer::new(transport.clone());
//! let mut badge = cart.subscribe();
//! cart.add_item(product.id, 2).await?;
//! badge.changed().await; // navigation badge re-fetches here
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod credentials;
pub mod error;
pub mod orders;
pub mod reviews;
pub mod session;
pub mod transport;
pub mod types;

pub use cart::{CartError, CartSynchronizer, CartWatcher};
pub use catalog::CatalogClient;
pub use checkout::{CheckoutError, CheckoutForm, CheckoutSubmitter, ValidationError};
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::ApiError;
pub use orders::OrdersClient;
pub use reviews::{ReviewError, ReviewPhase, ReviewReconciler, find_own_review};
pub use session::{
    AuthError, ProfileForm, ProfileUpdate, SessionState, SessionStore, compute_profile_diff,
};
pub use transport::{Body, Transport};
