//! PostgreSQL implementation of UserRepository.
//!
//! Plan state lives on the `users` row: `plan_keyname`, `plan_interval`,
//! `iap_id` (the external id) and `iap_source`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entitlement::{
    EntitlementRecord, PaymentSource, PlanInterval, PlanKeyname, PlanUpdate, UserAccount,
};
use crate::domain::foundation::{DomainError, ErrorCode, ExternalId, UserId};
use crate::ports::UserRepository;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a user's plan state.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    plan_keyname: String,
    plan_interval: String,
    iap_id: Option<String>,
    iap_source: Option<String>,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, e))
        };

        let user_id = UserId::new(row.id).map_err(|e| invalid("id", &e))?;
        let plan_keyname: PlanKeyname = row
            .plan_keyname
            .parse()
            .map_err(|e| invalid("plan_keyname", &e))?;
        let plan_interval: PlanInterval = row
            .plan_interval
            .parse()
            .map_err(|e| invalid("plan_interval", &e))?;
        let external_id = row
            .iap_id
            .filter(|id| !id.trim().is_empty())
            .map(ExternalId::new)
            .transpose()
            .map_err(|e| invalid("iap_id", &e))?;
        let source = row
            .iap_source
            .map(|s| s.parse::<PaymentSource>())
            .transpose()
            .map_err(|e| invalid("iap_source", &e))?;

        Ok(UserAccount {
            email: row.email,
            entitlement: EntitlementRecord {
                user_id,
                plan_keyname,
                plan_interval,
                external_id,
                source,
            },
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_id_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<UserId>, DomainError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE iap_id = $1 LIMIT 1")
                .bind(external_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to look up external id: {}", e))
                })?;

        id.map(|id| {
            UserId::new(id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e))
            })
        })
        .transpose()
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, plan_keyname, plan_interval, iap_id, iap_source
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch user: {}", e)))?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn update_user_plan(
        &self,
        user_id: &UserId,
        update: &PlanUpdate,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                plan_keyname = $2,
                plan_interval = $3,
                iap_id = $4,
                iap_source = $5
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(update.plan_keyname.as_str())
        .bind(update.plan_interval.as_str())
        .bind(update.external_id.as_ref().map(ExternalId::as_str))
        .bind(update.source.map(|s| s.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update user plan: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user_id", user_id.as_str()));
        }

        Ok(())
    }
}
