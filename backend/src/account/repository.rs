use crate::account::error::AccountError;
use crate::event::arango::store_error;
use crate::event::store::StoreError;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use arangors::client::reqwest::ReqwestClient;
use arangors::{AqlQuery, Database};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::account::AuthUser;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const ACCOUNTS_COLLECTION: &str = "accounts";

/// A stored account. Emails are kept normalized (trimmed, lower-case).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

impl Account {
    pub fn verify_password(&self, password: &str) -> bool {
        match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                log::error!("Stored password hash is unreadable: account_id={} error={}", self.id, e);
                false
            }
        }
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id.clone(),
            email: self.email.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;
    async fn create(&self, account: Account) -> Result<Account, AccountError>;
}

#[derive(Clone)]
pub struct AccountRepositoryImpl {
    pub db: Database<ReqwestClient>,
}

impl AccountRepositoryImpl {
    pub fn new(db: Database<ReqwestClient>) -> Self {
        Self { db }
    }

    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        if self.db.collection(ACCOUNTS_COLLECTION).await.is_err() {
            log::info!("Creating collection {}", ACCOUNTS_COLLECTION);
            self.db
                .create_collection(ACCOUNTS_COLLECTION)
                .await
                .map_err(store_error)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountRepository for AccountRepositoryImpl {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert("email", Value::String(email.to_string()));
        let query = AqlQuery::builder()
            .query("FOR a IN accounts FILTER a.email == @email LIMIT 1 RETURN a")
            .bind_vars(bind_vars)
            .build();

        match self.db.aql_query::<Account>(query).await {
            Ok(mut accounts) => Ok(accounts.pop()),
            Err(e) => {
                log::error!("Error querying account by email: {}", e);
                Err(AccountError::DatabaseError(e.to_string()))
            }
        }
    }

    async fn create(&self, account: Account) -> Result<Account, AccountError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert(
            "account",
            serde_json::to_value(&account).map_err(|e| AccountError::DatabaseError(e.to_string()))?,
        );
        bind_vars.insert("email", Value::String(account.email.clone()));
        // The existence check and the insert share one query so two sign-ups
        // with the same email cannot both pass.
        let query = AqlQuery::builder()
            .query(
                r#"
                LET existing = FIRST(FOR a IN accounts FILTER a.email == @email LIMIT 1 RETURN a._key)
                FILTER existing == null
                INSERT MERGE(@account, { _key: @account.id }) INTO accounts
                RETURN NEW
                "#,
            )
            .bind_vars(bind_vars)
            .build();

        match self.db.aql_query::<Account>(query).await {
            Ok(mut created) => created.pop().ok_or(AccountError::AlreadyExists),
            Err(e) => match store_error(e) {
                StoreError::Duplicate(_) => Err(AccountError::AlreadyExists),
                other => {
                    log::error!("Failed to create account: {}", other);
                    Err(AccountError::DatabaseError(other.to_string()))
                }
            },
        }
    }
}

/// Account repository kept in process memory, keyed by email.
#[derive(Clone, Default)]
pub struct MemoryAccountRepository {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        Ok(self.accounts.lock().await.get(email).cloned())
    }

    async fn create(&self, account: Account) -> Result<Account, AccountError> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&account.email) {
            return Err(AccountError::AlreadyExists);
        }
        accounts.insert(account.email.clone(), account.clone());
        Ok(account)
    }
}
