//! Axum router configuration for checkout endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_portal_session, create_web_checkout, get_subscription, handle_notification,
    verify_purchase, CheckoutAppState,
};

/// Create the checkout API router.
///
/// # Routes
///
/// ## Provider Endpoints (no user auth, verified per provider)
/// - `POST /notification` - Web, App Store and Play notifications
///
/// ## User Endpoints (require `X-User-Id`)
/// - `POST /iap` - Verify an in-app purchase receipt
/// - `POST /web` - Start a web checkout
/// - `GET /subscription` - Current plan, syncing `?checkoutSessionId=`
/// - `POST /subscription/portal` - Open the web billing portal
pub fn checkout_routes() -> Router<CheckoutAppState> {
    Router::new()
        .route("/notification", post(handle_notification))
        .route("/iap", post(verify_purchase))
        .route("/web", post(create_web_checkout))
        .route("/subscription", get(get_subscription))
        .route("/subscription/portal", post(create_portal_session))
}

/// Mounts the checkout routes under `/api/checkout`.
pub fn checkout_router() -> Router<CheckoutAppState> {
    Router::new().nest("/api/checkout", checkout_routes())
}
