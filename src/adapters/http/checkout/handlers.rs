//! HTTP handlers for checkout and subscription endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::entitlement::{
    CheckoutFulfillmentLookup, CreatePortalSessionCommand, CreatePortalSessionHandler,
    CreateWebCheckoutCommand, CreateWebCheckoutHandler, EntitlementVerifier,
    GetSubscriptionHandler, GetSubscriptionQuery, NotificationParser, PortalPlatform,
    PortalReturnUrls, ProcessNotificationCommand, ProcessNotificationHandler,
    ProcessNotificationResult, ReconciliationEngine, VerifyPurchaseCommand, VerifyPurchaseHandler,
};
use crate::domain::entitlement::{EntitlementError, PaymentSource};
use crate::domain::foundation::{UserId, ValidationError};
use crate::ports::{UserRepository, WebPaymentProvider};

use super::dto::{
    ErrorResponse, NotificationResponse, PlanResponse, PortalRequest, RedirectResponse,
    SubscriptionQueryParams, SubscriptionResponse, VerifyPurchaseRequest, VerifyPurchaseResponse,
};

/// Header carrying the web provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
#[derive(Clone)]
pub struct CheckoutAppState {
    pub users: Arc<dyn UserRepository>,
    pub web_payments: Arc<dyn WebPaymentProvider>,
    pub notification_parser: Arc<NotificationParser>,
    pub entitlement_verifier: Arc<EntitlementVerifier>,
    pub engine: Arc<ReconciliationEngine>,
    pub checkout_redirect_url: String,
    pub portal_return_urls: PortalReturnUrls,
}

impl CheckoutAppState {
    pub fn process_notification_handler(&self) -> ProcessNotificationHandler {
        ProcessNotificationHandler::new(self.notification_parser.clone(), self.engine.clone())
    }

    pub fn verify_purchase_handler(&self) -> VerifyPurchaseHandler {
        VerifyPurchaseHandler::new(self.entitlement_verifier.clone(), self.engine.clone())
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(
            self.users.clone(),
            Arc::new(CheckoutFulfillmentLookup::new(self.web_payments.clone())),
            self.engine.clone(),
        )
    }

    pub fn create_web_checkout_handler(&self) -> CreateWebCheckoutHandler {
        CreateWebCheckoutHandler::new(
            self.users.clone(),
            self.web_payments.clone(),
            self.checkout_redirect_url.clone(),
        )
    }

    pub fn create_portal_session_handler(&self) -> CreatePortalSessionHandler {
        CreatePortalSessionHandler::new(
            self.users.clone(),
            self.web_payments.clone(),
            self.portal_return_urls.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Logged-in user, identified by the `X-User-Id` header set by the gateway.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Provider Notifications (no user auth, verified per provider)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout/notification - Receive a provider notification
pub async fn handle_notification(
    State(state): State<CheckoutAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = match String::from_utf8(body.to_vec()) {
        Ok(body) => body,
        Err(e) if signature.is_none() => {
            tracing::warn!(error = %e, "Notification body is not UTF-8");
            return Ok(Json(NotificationResponse::malformed()));
        }
        Err(e) => return Err(ValidationError::invalid_format("body", e.to_string()).into()),
    };

    let handler = state.process_notification_handler();
    let result = handler
        .handle(ProcessNotificationCommand { signature, body })
        .await?;

    let response = match result {
        ProcessNotificationResult::Handled(_) => NotificationResponse::handled(),
        ProcessNotificationResult::Unrecognized => NotificationResponse::unhandled(),
        ProcessNotificationResult::Malformed => NotificationResponse::malformed(),
    };
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/checkout/subscription - Current plan, syncing a finished checkout
pub async fn get_subscription(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
    Query(params): Query<SubscriptionQueryParams>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let handler = state.get_subscription_handler();
    let query = GetSubscriptionQuery {
        user_id: user.user_id,
        checkout_session_id: params.checkout_session_id.filter(|id| !id.is_empty()),
    };

    let result = handler.handle(query).await?;

    Ok(Json(SubscriptionResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout/iap - Verify an in-app purchase receipt
pub async fn verify_purchase(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
    Json(request): Json<VerifyPurchaseRequest>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let source: PaymentSource = request.iap_source.parse()?;

    let handler = state.verify_purchase_handler();
    let cmd = VerifyPurchaseCommand {
        user_id: user.user_id,
        source,
        transaction_receipt: request.transaction_receipt,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(VerifyPurchaseResponse {
        valid: true,
        subscription: PlanResponse::from(&result.record),
    }))
}

/// POST /api/checkout/web - Start a web checkout
pub async fn create_web_checkout(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let handler = state.create_web_checkout_handler();
    let result = handler
        .handle(CreateWebCheckoutCommand {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(RedirectResponse {
        valid: true,
        url: result.url,
    }))
}

/// POST /api/checkout/subscription/portal - Open the web billing portal
pub async fn create_portal_session(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
    Json(request): Json<PortalRequest>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let platform: PortalPlatform = request.platform.parse()?;

    let handler = state.create_portal_session_handler();
    let result = handler
        .handle(CreatePortalSessionCommand {
            user_id: user.user_id,
            platform,
        })
        .await?;

    Ok(Json(RedirectResponse {
        valid: true,
        url: result.url,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts entitlement errors to HTTP responses.
#[derive(Debug)]
pub struct CheckoutApiError(EntitlementError);

impl From<EntitlementError> for CheckoutApiError {
    fn from(err: EntitlementError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for CheckoutApiError {
    fn from(err: ValidationError) -> Self {
        Self(EntitlementError::Validation(err))
    }
}

impl IntoResponse for CheckoutApiError {
    fn into_response(self) -> axum::response::Response {
        let error_code = match &self.0 {
            EntitlementError::Validation(_) => "VALIDATION_FAILED",
            EntitlementError::Trust(_) => "UNTRUSTED_PAYLOAD",
            EntitlementError::InactiveSubscription => "SUBSCRIPTION_INACTIVE",
            EntitlementError::Upstream { .. } => "PROVIDER_UNAVAILABLE",
            EntitlementError::Conflict(_) => "OWNERSHIP_CONFLICT",
            EntitlementError::Repository(_) => "INTERNAL_ERROR",
        };

        // Internal details stay in the logs.
        let message = match &self.0 {
            EntitlementError::Repository(detail) => {
                tracing::error!(error = %detail, "Repository failure");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse::new(error_code, message);
        (self.0.status_code(), Json(body)).into_response()
    }
}
