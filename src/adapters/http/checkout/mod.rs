//! HTTP adapter for checkout and subscription endpoints.
//!
//! - `POST /api/checkout/notification` - Provider notifications
//! - `POST /api/checkout/iap` - Verify an in-app purchase receipt
//! - `POST /api/checkout/web` - Start a web checkout
//! - `GET /api/checkout/subscription` - Current plan, syncing a finished checkout
//! - `POST /api/checkout/subscription/portal` - Web billing portal

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedUser, CheckoutApiError, CheckoutAppState, SIGNATURE_HEADER};
pub use routes::{checkout_router, checkout_routes};
