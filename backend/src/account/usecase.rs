use crate::account::error::AccountError;
use crate::account::repository::{Account, AccountRepository};
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use shared::dates::canonical_timestamp;
use shared::models::account::{AuthUser, Credentials};
use shared::validation::FieldErrors;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[async_trait::async_trait]
pub trait AccountUseCase: Send + Sync {
    async fn sign_up(&self, credentials: Credentials) -> Result<AuthUser, AccountError>;
    async fn sign_in(&self, credentials: Credentials) -> Result<AuthUser, AccountError>;
}

pub struct AccountUseCaseImpl {
    pub repo: Arc<dyn AccountRepository>,
}

impl AccountUseCaseImpl {
    pub fn new(repo: Arc<dyn AccountRepository>) -> Self {
        Self { repo }
    }
}

fn validate_credentials(credentials: &Credentials) -> Result<(), AccountError> {
    credentials
        .validate()
        .map_err(|errors| AccountError::Validation(FieldErrors::from(errors)))
}

#[async_trait::async_trait]
impl AccountUseCase for AccountUseCaseImpl {
    async fn sign_up(&self, credentials: Credentials) -> Result<AuthUser, AccountError> {
        validate_credentials(&credentials)?;
        let email = credentials.normalized_email();

        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AccountError::AlreadyExists);
        }

        let salt_string = argon2::password_hash::SaltString::generate(
            &mut argon2::password_hash::rand_core::OsRng,
        );
        let password_hash = Argon2::default()
            .hash_password(credentials.password.as_bytes(), &salt_string)
            .map_err(|e| AccountError::DatabaseError(format!("Failed to hash password: {}", e)))?
            .to_string();

        let account = Account {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            created_at: canonical_timestamp(&Utc::now()),
        };

        let created = self.repo.create(account).await?;
        log::info!("Account created: account_id={}", created.id);
        Ok(created.to_auth_user())
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<AuthUser, AccountError> {
        validate_credentials(&credentials)?;
        let email = credentials.normalized_email();

        match self.repo.find_by_email(&email).await? {
            Some(account) if account.verify_password(&credentials.password) => Ok(account.to_auth_user()),
            Some(account) => {
                log::info!("Sign-in rejected: wrong password for account_id={}", account.id);
                Err(AccountError::InvalidCredentials)
            }
            None => {
                log::info!("Sign-in rejected: no account for the given email");
                Err(AccountError::InvalidCredentials)
            }
        }
    }
}
