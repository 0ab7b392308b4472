//! Checkout form validation and order submission.
//!
//! The form is ephemeral and never persisted. Field setters mirror the
//! storefront's input filters (digits-only, length-capped); `validate` runs
//! a deterministic pipeline in fixed order and short-circuits on the first
//! failure, so exactly one error is shown at a time. A valid form plus the
//! current cart becomes a single atomic order-creation request carrying
//! only the payment descriptor - the full card number and the CVV never
//! leave the client.

use chrono::Datelike;
use thiserror::Error;
use tracing::instrument;

use crate::cart::CartSynchronizer;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{CartSummary, Order, OrderRequest, PaymentDescriptor};

use shoppy_core::Email;

/// Max digits kept for a card number (longest PAN in the wild).
const CARD_NUMBER_MAX_DIGITS: usize = 19;
const PHONE_DIGITS: usize = 10;
const CVV_MAX_DIGITS: usize = 4;

/// Local, pre-submission validation failure. Never reaches the network.
///
/// Display strings are user-facing verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Please enter {0}")]
    MissingField(&'static str),
    #[error("Phone number must be exactly 10 digits")]
    PhoneLength,
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("Enter a valid card number")]
    InvalidCardNumber,
}

/// Errors that can occur when placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Local validation failed; no request was issued.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend rejected the order.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CheckoutError {
    /// One display string for the invoking view.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Api(err) => err.display_message("Order failed"),
        }
    }
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn digits_capped(s: &str, cap: usize) -> String {
    digits(s).chars().take(cap).collect()
}

/// The multi-field order form.
///
/// All values survive a failed submission; nothing is cleared for the user.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    customer_name: String,
    address: String,
    phone: String,
    email: String,
    cardholder_name: String,
    card_number: String,
    expiry_month: u8,
    expiry_year: u16,
    cvv: String,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutForm {
    /// A blank form with the default expiry preselected (December, two
    /// years out).
    #[must_use]
    pub fn new() -> Self {
        let current_year = u16::try_from(chrono::Utc::now().year()).unwrap_or(2026);
        Self {
            customer_name: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            cardholder_name: String::new(),
            card_number: String::new(),
            expiry_month: 12,
            expiry_year: current_year + 2,
            cvv: String::new(),
        }
    }

    pub fn set_customer_name(&mut self, value: impl Into<String>) {
        self.customer_name = value.into();
    }

    pub fn set_address(&mut self, value: impl Into<String>) {
        self.address = value.into();
    }

    /// Non-digits are dropped and the value capped at 10 digits, matching
    /// the input filter of the storefront field.
    pub fn set_phone(&mut self, value: &str) {
        self.phone = digits_capped(value, PHONE_DIGITS);
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.email = value.into();
    }

    pub fn set_cardholder_name(&mut self, value: impl Into<String>) {
        self.cardholder_name = value.into();
    }

    /// Non-digits are dropped and the value capped at 19 digits.
    pub fn set_card_number(&mut self, value: &str) {
        self.card_number = digits_capped(value, CARD_NUMBER_MAX_DIGITS);
    }

    /// Month is clamped to 1..=12.
    pub fn set_expiry(&mut self, month: u8, year: u16) {
        self.expiry_month = month.clamp(1, 12);
        self.expiry_year = year;
    }

    /// Non-digits are dropped and the value capped at 4 digits.
    pub fn set_cvv(&mut self, value: &str) {
        self.cvv = digits_capped(value, CVV_MAX_DIGITS);
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    #[must_use]
    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    /// Run the validation pipeline and build the order request.
    ///
    /// Checks run in fixed order and stop at the first failure:
    /// cart non-empty; required fields (full name, address, phone, email,
    /// cardholder name, card number, CVV - the first missing one wins);
    /// phone reduces to exactly 10 digits; email has the basic
    /// `local@domain.tld` shape; the card number yields 4 last digits.
    ///
    /// # Errors
    ///
    /// The first failing check, as [`ValidationError`].
    pub fn validate(&self, cart: &CartSummary) -> Result<OrderRequest, ValidationError> {
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }

        let required: [(&str, &'static str); 7] = [
            (&self.customer_name, "full name"),
            (&self.address, "address"),
            (&self.phone, "phone number"),
            (&self.email, "email address"),
            (&self.cardholder_name, "cardholder name"),
            (&self.card_number, "card number"),
            (&self.cvv, "cvv"),
        ];
        for (value, label) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(label));
            }
        }

        let phone = digits(&self.phone);
        if phone.len() != PHONE_DIGITS {
            return Err(ValidationError::PhoneLength);
        }

        if Email::parse(&self.email).is_err() {
            return Err(ValidationError::InvalidEmail);
        }

        let card = digits(&self.card_number);
        if card.len() < 4 {
            return Err(ValidationError::InvalidCardNumber);
        }
        let card_last4 = card.chars().skip(card.len() - 4).collect::<String>();

        Ok(OrderRequest {
            shipping_customer_name: Some(self.customer_name.clone()),
            shipping_address: Some(self.address.clone()),
            shipping_phone: Some(phone),
            shipping_email: Some(self.email.clone()),
            payment: PaymentDescriptor {
                cardholder_name: self.cardholder_name.clone(),
                card_last4,
                expiry_month: self.expiry_month,
                expiry_year: self.expiry_year,
            },
        })
    }
}

/// Converts a valid form plus the current cart into one order-creation
/// request.
#[derive(Clone)]
pub struct CheckoutSubmitter {
    transport: Transport,
    cart: CartSynchronizer,
}

impl CheckoutSubmitter {
    /// Create a submitter sharing the cart synchronizer with the rest of
    /// the page.
    #[must_use]
    pub const fn new(transport: Transport, cart: CartSynchronizer) -> Self {
        Self { transport, cart }
    }

    /// Validate and place the order.
    ///
    /// The cart is re-fetched at submit time - it may have been emptied
    /// concurrently since page entry. On success the cached cart is stale:
    /// the invalidation broadcast fires and observers re-fetch; nothing is
    /// cleared client-side. On failure the form retains all entered values
    /// (it is not consumed).
    ///
    /// # Errors
    ///
    /// `CheckoutError::Validation` before any request, `CheckoutError::Api`
    /// on the backend rejection, normalized for display.
    #[instrument(skip(self, form))]
    pub async fn submit(&self, form: &CheckoutForm) -> Result<Order, CheckoutError> {
        let summary = self.cart.refresh().await;
        let request = form.validate(&summary)?;

        let order: Order = self.transport.post("/orders", &request).await?;
        self.cart.notify_changed();
        Ok(order)
    }
}
