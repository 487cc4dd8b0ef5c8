//! nowtify-core/src/repositories/sqlite/history.rs

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use nowtify_common::models::history::{HistoryEntry, HISTORY_CAP};
use nowtify_common::models::platform::Platform;
use nowtify_common::traits::repository_traits::HistoryRepository;

use crate::Error;

#[derive(Clone)]
pub struct SqliteHistoryRepository {
    pool: Pool<Sqlite>,
}

impl SqliteHistoryRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for SqliteHistoryRepository {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO stream_history
                (streamer_id, name, platform, title, game, viewer_count,
                 duration_secs, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
            .bind(entry.streamer_id)
            .bind(&entry.name)
            .bind(entry.platform.to_string())
            .bind(&entry.title)
            .bind(&entry.game)
            .bind(entry.viewer_count.map(|v| v as i64))
            .bind(entry.duration_secs)
            .bind(entry.timestamp)
            .execute(&self.pool)
            .await?;

        // Ring-buffer semantics: evict the oldest rows past the cap.
        sqlx::query(
            r#"
            DELETE FROM stream_history
             WHERE history_id NOT IN (
                SELECT history_id FROM stream_history
                 ORDER BY history_id DESC
                 LIMIT ?
             )
            "#
        )
            .bind(HISTORY_CAP as i64)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<HistoryEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT streamer_id, name, platform, title, game, viewer_count,
                   duration_secs, created_at
              FROM stream_history
             ORDER BY history_id DESC
             LIMIT ?
            "#
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| {
                let viewer_count: Option<i64> = r.try_get("viewer_count")?;
                Ok(HistoryEntry {
                    streamer_id: r.try_get("streamer_id")?,
                    name: r.try_get("name")?,
                    platform: Platform::from_str(&r.try_get::<String, _>("platform")?)
                        .map_err(Error::Platform)?,
                    title: r.try_get("title")?,
                    game: r.try_get("game")?,
                    viewer_count: viewer_count.map(|v| v as u32),
                    duration_secs: r.try_get("duration_secs")?,
                    timestamp: r.try_get::<DateTime<Utc>, _>("created_at")?,
                })
            })
            .collect()
    }

    async fn set_last_duration(&self, streamer_id: Uuid, duration_secs: i64) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE stream_history
               SET duration_secs = ?
             WHERE history_id = (
                SELECT history_id FROM stream_history
                 WHERE streamer_id = ?
                 ORDER BY history_id DESC
                 LIMIT 1
             )
            "#
        )
            .bind(duration_secs)
            .bind(streamer_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        sqlx::query("DELETE FROM stream_history")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
