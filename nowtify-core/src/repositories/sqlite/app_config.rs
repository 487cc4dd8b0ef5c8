//! nowtify-core/src/repositories/sqlite/app_config.rs
//!
//! Keyed JSON records: API credentials, user settings, and the cached
//! Twitch app token. Each key is independently readable/writable.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Pool, Row, Sqlite};

use nowtify_common::models::config::{ApiCredentials, Settings, TwitchToken};
use nowtify_common::traits::repository_traits::ConfigRepository;

use crate::Error;

const KEY_API_CREDENTIALS: &str = "api_keys";
const KEY_SETTINGS: &str = "settings";
const KEY_TWITCH_TOKEN: &str = "twitch_token";

#[derive(Clone)]
pub struct SqliteConfigRepository {
    pool: Pool<Sqlite>,
}

impl SqliteConfigRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let row = sqlx::query("SELECT config_value FROM app_config WHERE config_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let raw: String = r.try_get("config_value")?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn set_value<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), Error> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(
            r#"
            INSERT INTO app_config (config_key, config_value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (config_key) DO UPDATE SET
                config_value = excluded.config_value,
                updated_at = excluded.updated_at
            "#
        )
            .bind(key)
            .bind(raw)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM app_config WHERE config_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigRepository for SqliteConfigRepository {
    async fn get_api_credentials(&self) -> Result<ApiCredentials, Error> {
        Ok(self.get_value(KEY_API_CREDENTIALS).await?.unwrap_or_default())
    }

    async fn set_api_credentials(&self, creds: &ApiCredentials) -> Result<(), Error> {
        self.set_value(KEY_API_CREDENTIALS, creds).await
    }

    async fn get_settings(&self) -> Result<Settings, Error> {
        Ok(self.get_value(KEY_SETTINGS).await?.unwrap_or_default())
    }

    async fn set_settings(&self, settings: &Settings) -> Result<(), Error> {
        self.set_value(KEY_SETTINGS, settings).await
    }

    async fn get_twitch_token(&self) -> Result<Option<TwitchToken>, Error> {
        self.get_value(KEY_TWITCH_TOKEN).await
    }

    async fn set_twitch_token(&self, token: &TwitchToken) -> Result<(), Error> {
        self.set_value(KEY_TWITCH_TOKEN, token).await
    }

    async fn clear_twitch_token(&self) -> Result<(), Error> {
        self.delete_value(KEY_TWITCH_TOKEN).await
    }
}
