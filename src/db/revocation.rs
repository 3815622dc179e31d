//! Key-value store tracking active refresh tokens.
//!
//! A refresh token is active while `refreshToken:<token>` is present and not
//! past its expiry. Expired rows are invisible to reads and swept by
//! `delete_expired`.

use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::sqlite::SqlitePool;

/// Key prefix for refresh token entries.
const REFRESH_TOKEN_KEY_PREFIX: &str = "refreshToken:";

/// Store key for a refresh token.
fn refresh_token_key(token: &str) -> String {
    format!("{}{}", REFRESH_TOKEN_KEY_PREFIX, token)
}

pub struct RevocationStore {
    pool: SqlitePool,
}

impl RevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Set `key` to `value` for `ttl_secs` seconds, replacing any existing entry.
    pub async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), sqlx::Error> {
        let expires_at = now_secs().saturating_add(ttl_secs) as i64;

        sqlx::query("INSERT OR REPLACE INTO revocation_entries (key, value, expires_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get the value for `key` if present and not expired.
    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM revocation_entries WHERE key = ? AND expires_at > ?")
                .bind(key)
                .bind(now_secs() as i64)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    /// Delete `key`. Deleting an absent key is a no-op.
    /// Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revocation_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all expired entries.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revocation_entries WHERE expires_at <= ?")
            .bind(now_secs() as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Record a freshly issued refresh token for `subject`.
    pub async fn activate_refresh_token(
        &self,
        token: &str,
        subject: &str,
        ttl_secs: u64,
    ) -> Result<(), sqlx::Error> {
        self.put(&refresh_token_key(token), subject, ttl_secs).await
    }

    /// Subject recorded for an active refresh token.
    pub async fn refresh_token_subject(&self, token: &str) -> Result<Option<String>, sqlx::Error> {
        self.get(&refresh_token_key(token)).await
    }

    /// Revoke a refresh token.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        self.delete(&refresh_token_key(token)).await
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
