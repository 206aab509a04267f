//! CreateWebCheckoutHandler - Command handler for starting a web subscription checkout.

use std::sync::Arc;

use crate::domain::entitlement::{EntitlementError, PaymentSource};
use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};
use crate::ports::{CreateCheckoutRequest, CreateCustomerRequest, UserRepository, WebPaymentProvider};

/// Redirect used when none is configured. The provider substitutes the
/// session id placeholder on redirect.
pub const DEFAULT_CHECKOUT_REDIRECT_URL: &str =
    "http://localhost:8081/subscription?checkoutSessionId={CHECKOUT_SESSION_ID}";

#[derive(Debug, Clone)]
pub struct CreateWebCheckoutCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWebCheckoutResult {
    pub session_id: String,
    pub url: String,
    pub customer_id: String,
}

pub struct CreateWebCheckoutHandler {
    users: Arc<dyn UserRepository>,
    web: Arc<dyn WebPaymentProvider>,
    redirect_url: String,
}

impl CreateWebCheckoutHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        web: Arc<dyn WebPaymentProvider>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            web,
            redirect_url: redirect_url.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateWebCheckoutCommand,
    ) -> Result<CreateWebCheckoutResult, EntitlementError> {
        // 1. Load the user
        let account = self.users.find_by_id(&cmd.user_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user_id", cmd.user_id.as_str())
        })?;

        // 2. App-store subscribers manage billing on their device
        if let Some(source) = account.entitlement.source.filter(PaymentSource::is_app_store) {
            return Err(ValidationError::invalid_format(
                "iapSource",
                format!("You are already subscribed via {}.", source.display_name()),
            )
            .into());
        }

        // 3. Resolve the provider customer
        let customer_id = match (&account.entitlement.source, &account.entitlement.external_id) {
            (Some(PaymentSource::Web), Some(external_id)) => external_id.as_str().to_string(),
            _ => {
                let email = account.email.to_lowercase();
                match self.web.find_customer_by_email(&email).await? {
                    Some(customer) => customer.id,
                    None => {
                        let customer = self
                            .web
                            .create_customer(CreateCustomerRequest {
                                user_id: cmd.user_id.clone(),
                                email,
                            })
                            .await?;
                        tracing::info!(
                            user_id = %cmd.user_id,
                            customer_id = %customer.id,
                            "Created web customer"
                        );
                        customer.id
                    }
                }
            }
        };

        // 4. Open the checkout session
        let session = self
            .web
            .create_checkout_session(CreateCheckoutRequest {
                user_id: cmd.user_id.clone(),
                customer_id: customer_id.clone(),
                success_url: self.redirect_url.clone(),
                cancel_url: self.redirect_url.clone(),
            })
            .await?;

        tracing::info!(user_id = %cmd.user_id, session_id = %session.id, "Checkout session created");

        Ok(CreateWebCheckoutResult {
            session_id: session.id,
            url: session.url,
            customer_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUserRepository;
    use crate::adapters::stripe::MockWebPaymentProvider;
    use crate::domain::entitlement::PlanUpdate;
    use crate::domain::foundation::ExternalId;
    use crate::ports::{Customer, PaymentError};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn setup(web: MockWebPaymentProvider) -> (Arc<InMemoryUserRepository>, CreateWebCheckoutHandler) {
        let repo = Arc::new(InMemoryUserRepository::new());
        repo.insert_free(&user("a"), "Alice@Example.com").await;
        let handler = CreateWebCheckoutHandler::new(
            repo.clone(),
            Arc::new(web),
            DEFAULT_CHECKOUT_REDIRECT_URL,
        );
        (repo, handler)
    }

    fn cmd() -> CreateWebCheckoutCommand {
        CreateWebCheckoutCommand { user_id: user("a") }
    }

    #[tokio::test]
    async fn creates_customer_when_none_exists() {
        let web = MockWebPaymentProvider::new();
        let (_, handler) = setup(web.clone()).await;

        let result = handler.handle(cmd()).await.unwrap();

        assert_eq!(result.customer_id, "cus_mock_1");
        assert!(result.url.starts_with("https://checkout.stripe.com/"));
        let create = web
            .calls()
            .into_iter()
            .find(|c| c.method == "create_customer")
            .unwrap();
        assert_eq!(create.args[1], "alice@example.com");
        let checkout = web
            .calls()
            .into_iter()
            .find(|c| c.method == "create_checkout_session")
            .unwrap();
        assert_eq!(checkout.args[2], DEFAULT_CHECKOUT_REDIRECT_URL);
    }

    #[tokio::test]
    async fn reuses_customer_found_by_email() {
        let web = MockWebPaymentProvider::new();
        web.add_customer(Customer {
            id: "cus_existing".to_string(),
            email: Some("alice@example.com".to_string()),
        });
        let (_, handler) = setup(web.clone()).await;

        let result = handler.handle(cmd()).await.unwrap();

        assert_eq!(result.customer_id, "cus_existing");
        assert!(!web.was_called("create_customer"));
    }

    #[tokio::test]
    async fn reuses_web_external_id() {
        let web = MockWebPaymentProvider::new();
        let (repo, handler) = setup(web.clone()).await;
        repo.update_user_plan(
            &user("a"),
            &PlanUpdate::premium(ExternalId::new("cus_known").unwrap(), PaymentSource::Web),
        )
        .await
        .unwrap();

        let result = handler.handle(cmd()).await.unwrap();

        assert_eq!(result.customer_id, "cus_known");
        assert!(!web.was_called("find_customer_by_email"));
    }

    #[tokio::test]
    async fn app_store_subscriber_is_rejected() {
        let web = MockWebPaymentProvider::new();
        let (repo, handler) = setup(web.clone()).await;
        repo.update_user_plan(
            &user("a"),
            &PlanUpdate::premium(ExternalId::new("2000").unwrap(), PaymentSource::Ios),
        )
        .await
        .unwrap();

        let err = handler.handle(cmd()).await.unwrap_err();

        assert!(matches!(err, EntitlementError::Validation(_)));
        assert!(err.to_string().contains("already subscribed"));
        assert!(web.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_upstream_error() {
        let web = MockWebPaymentProvider::new();
        web.set_method_error(
            "create_checkout_session",
            PaymentError::network(PaymentSource::Web, "timeout"),
        );
        let (_, handler) = setup(web).await;

        let err = handler.handle(cmd()).await.unwrap_err();

        assert!(matches!(err, EntitlementError::Upstream { .. }));
    }
}
