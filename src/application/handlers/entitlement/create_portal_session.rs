//! CreatePortalSessionHandler - Command handler for the web billing portal.

use std::str::FromStr;
use std::sync::Arc;

use crate::domain::entitlement::{EntitlementError, PaymentSource};
use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};
use crate::ports::{UserRepository, WebPaymentProvider};

/// Where the portal returns the user afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalPlatform {
    App,
    Web,
}

impl FromStr for PortalPlatform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" => Ok(PortalPlatform::App),
            "web" => Ok(PortalPlatform::Web),
            other => Err(ValidationError::invalid_format(
                "platform",
                format!("unknown platform '{}'", other),
            )),
        }
    }
}

/// Return URLs per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalReturnUrls {
    pub app: Option<String>,
    pub web: Option<String>,
}

impl PortalReturnUrls {
    fn for_platform(&self, platform: PortalPlatform) -> Option<&str> {
        match platform {
            PortalPlatform::App => self.app.as_deref(),
            PortalPlatform::Web => self.web.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePortalSessionCommand {
    pub user_id: UserId,
    pub platform: PortalPlatform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePortalSessionResult {
    pub url: String,
}

pub struct CreatePortalSessionHandler {
    users: Arc<dyn UserRepository>,
    web: Arc<dyn WebPaymentProvider>,
    return_urls: PortalReturnUrls,
}

impl CreatePortalSessionHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        web: Arc<dyn WebPaymentProvider>,
        return_urls: PortalReturnUrls,
    ) -> Self {
        Self {
            users,
            web,
            return_urls,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePortalSessionCommand,
    ) -> Result<CreatePortalSessionResult, EntitlementError> {
        let account = self.users.find_by_id(&cmd.user_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user_id", cmd.user_id.as_str())
        })?;

        let customer_id = match (account.entitlement.source, &account.entitlement.external_id) {
            (Some(PaymentSource::Web), Some(external_id)) => external_id,
            _ => {
                return Err(ValidationError::invalid_format(
                    "iapSource",
                    "Stripe users can only access the portal",
                )
                .into())
            }
        };

        let session = self
            .web
            .create_portal_session(
                customer_id.as_str(),
                self.return_urls.for_platform(cmd.platform),
            )
            .await?;

        Ok(CreatePortalSessionResult { url: session.url })
    }
}
