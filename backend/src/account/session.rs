use async_trait::async_trait;
use shared::models::account::AuthUser;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 3600;

/// Session id to signed-in user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set_session(&self, session_id: &str, user: &AuthUser) -> Result<(), String>;
    async fn get_session(&self, session_id: &str) -> Result<Option<AuthUser>, String>;
    async fn delete_session(&self, session_id: &str) -> Result<(), String>;
    async fn ping(&self) -> Result<(), String>;
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

#[derive(Clone)]
pub struct RedisSessionStore {
    pub client: redis::Client,
    pub ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, ttl_seconds: u64) -> Self {
        Self { client, ttl_seconds }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn set_session(&self, session_id: &str, user: &AuthUser) -> Result<(), String> {
        let value = serde_json::to_string(user).map_err(|e| e.to_string())?;
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        redis::cmd("SETEX")
            .arg(session_key(session_id))
            .arg(self.ttl_seconds)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<AuthUser>, String> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        let value: Option<String> = redis::cmd("GET")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())?;

        match value {
            Some(value) => serde_json::from_str(&value)
                .map(Some)
                .map_err(|e| format!("Corrupt session payload: {}", e)),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), String> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        redis::cmd("DEL")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())
    }

    async fn ping(&self) -> Result<(), String> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Sessions kept in process memory; they do not expire.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, AuthUser>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set_session(&self, session_id: &str, user: &AuthUser) -> Result<(), String> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session_id.to_string(), user.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<AuthUser>, String> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), String> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), String> {
        Ok(())
    }
}
