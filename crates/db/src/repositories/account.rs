//! Account repository: user lookup and credential checks.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use splitledger_core::identity::{Account, AccountGateway, hash_password, verify_password};
use splitledger_core::{StoreError, StoreResult};
use splitledger_shared::types::UserId;
use uuid::Uuid;

use super::convert::{db_error, now};
use crate::entities::users;

/// Account repository backed by `PostgreSQL`.
///
/// Passwords are stored as Argon2id PHC strings.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model_by_email(&self, email: &str) -> StoreResult<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await
            .map_err(db_error)
    }
}

fn account_from_model(model: users::Model) -> Account {
    Account {
        id: UserId::from_uuid(model.id),
        email: model.email,
        name: model.name,
    }
}

#[async_trait]
impl AccountGateway for AccountRepository {
    async fn find_account(&self, id: UserId) -> StoreResult<Option<Account>> {
        let user = users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(user.map(account_from_model))
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(self.find_model_by_email(email).await?.map(account_from_model))
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> StoreResult<Option<Account>> {
        let Some(user) = self.find_model_by_email(email).await? else {
            return Ok(None);
        };

        let matches = verify_password(password, &user.password_hash)
            .map_err(|err| StoreError::Corrupt(format!("users.password_hash: {err}")))?;
        Ok(matches.then(|| account_from_model(user)))
    }

    async fn register_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> StoreResult<Account> {
        let password_hash =
            hash_password(password).map_err(|err| StoreError::Backend(err.to_string()))?;
        let timestamp = now();

        let user = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            email: Set(email.trim().to_lowercase()),
            name: Set(name.trim().to_string()),
            password_hash: Set(password_hash),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;

        tracing::info!(user_id = %user.id, "account registered");
        Ok(account_from_model(user))
    }
}
