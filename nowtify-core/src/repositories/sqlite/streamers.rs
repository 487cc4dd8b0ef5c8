//! nowtify-core/src/repositories/sqlite/streamers.rs

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use nowtify_common::models::platform::Platform;
use nowtify_common::models::streamer::{LiveStatus, Streamer, StreamerPatch};
use nowtify_common::traits::repository_traits::StreamerRepository;

use crate::Error;

#[derive(Clone)]
pub struct SqliteStreamerRepository {
    pool: Pool<Sqlite>,
}

impl SqliteStreamerRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

fn row_to_streamer(r: &SqliteRow) -> Result<Streamer, Error> {
    let viewer_count: Option<i64> = r.try_get("viewer_count")?;
    let status = LiveStatus {
        is_live: r.try_get::<i64, _>("is_live")? != 0,
        title: r.try_get("title")?,
        game: r.try_get("game")?,
        viewer_count: viewer_count.map(|v| v as u32),
        thumbnail_url: r.try_get("thumbnail_url")?,
        started_at: r.try_get::<Option<DateTime<Utc>>, _>("started_at")?,
        ended_at: r.try_get::<Option<DateTime<Utc>>, _>("ended_at")?,
        last_live_date: r.try_get::<Option<DateTime<Utc>>, _>("last_live_date")?,
        error: r.try_get::<i64, _>("status_error")? != 0,
    };

    Ok(Streamer {
        streamer_id: r.try_get("streamer_id")?,
        platform: Platform::from_str(&r.try_get::<String, _>("platform")?)
            .map_err(Error::Platform)?,
        handle: r.try_get("handle")?,
        display_name: r.try_get("display_name")?,
        avatar_url: r.try_get("avatar_url")?,
        team: r.try_get("team")?,
        status,
        last_checked_at: r.try_get::<Option<DateTime<Utc>>, _>("last_checked_at")?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

const SELECT_COLS: &str = r#"
    SELECT streamer_id, platform, handle, handle_lower, display_name,
           avatar_url, team,
           is_live, title, game, viewer_count, thumbnail_url,
           started_at, ended_at, last_live_date, status_error,
           last_checked_at, created_at
      FROM streamers
"#;

#[async_trait]
impl StreamerRepository for SqliteStreamerRepository {
    async fn list(&self) -> Result<Vec<Streamer>, Error> {
        let rows = sqlx::query(&format!("{SELECT_COLS} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_streamer).collect()
    }

    async fn get(&self, streamer_id: Uuid) -> Result<Option<Streamer>, Error> {
        let row = sqlx::query(&format!("{SELECT_COLS} WHERE streamer_id = ?"))
            .bind(streamer_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_streamer).transpose()
    }

    async fn find_by_handle(&self, platform: Platform, handle: &str) -> Result<Option<Streamer>, Error> {
        let row = sqlx::query(&format!(
            "{SELECT_COLS} WHERE platform = ? AND handle_lower = ?"
        ))
            .bind(platform.to_string())
            .bind(handle.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_streamer).transpose()
    }

    async fn upsert(&self, s: &Streamer) -> Result<(), Error> {
        // The `(platform, handle)` invariant is checked against *other*
        // ids so re-upserting the same streamer stays legal.
        if let Some(existing) = self.find_by_handle(s.platform, &s.handle).await? {
            if existing.streamer_id != s.streamer_id {
                return Err(Error::AlreadyTracked(format!("{}/{}", s.platform, s.handle)));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO streamers
                (streamer_id, platform, handle, handle_lower, display_name,
                 avatar_url, team,
                 is_live, title, game, viewer_count, thumbnail_url,
                 started_at, ended_at, last_live_date, status_error,
                 last_checked_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (streamer_id) DO UPDATE SET
                platform = excluded.platform,
                handle = excluded.handle,
                handle_lower = excluded.handle_lower,
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                team = excluded.team,
                is_live = excluded.is_live,
                title = excluded.title,
                game = excluded.game,
                viewer_count = excluded.viewer_count,
                thumbnail_url = excluded.thumbnail_url,
                started_at = excluded.started_at,
                ended_at = excluded.ended_at,
                last_live_date = excluded.last_live_date,
                status_error = excluded.status_error,
                last_checked_at = excluded.last_checked_at
            "#
        )
            .bind(s.streamer_id)
            .bind(s.platform.to_string())
            .bind(&s.handle)
            .bind(s.handle.to_lowercase())
            .bind(&s.display_name)
            .bind(&s.avatar_url)
            .bind(&s.team)
            .bind(s.status.is_live as i64)
            .bind(&s.status.title)
            .bind(&s.status.game)
            .bind(s.status.viewer_count.map(|v| v as i64))
            .bind(&s.status.thumbnail_url)
            .bind(s.status.started_at)
            .bind(s.status.ended_at)
            .bind(s.status.last_live_date)
            .bind(s.status.error as i64)
            .bind(s.last_checked_at)
            .bind(s.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove(&self, streamer_id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM streamers WHERE streamer_id = ?")
            .bind(streamer_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_by_team(&self, team: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM streamers WHERE team = ?")
            .bind(team)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn patch(&self, streamer_id: Uuid, patch: &StreamerPatch) -> Result<(), Error> {
        // Merge-before-write: omitted fields keep their stored values via
        // COALESCE; the status block is only rewritten when present.
        if let Some(status) = &patch.status {
            sqlx::query(
                r#"
                UPDATE streamers SET
                    display_name = COALESCE(?, display_name),
                    avatar_url = COALESCE(?, avatar_url),
                    team = COALESCE(?, team),
                    is_live = ?,
                    title = ?,
                    game = ?,
                    viewer_count = ?,
                    thumbnail_url = ?,
                    started_at = ?,
                    ended_at = ?,
                    last_live_date = ?,
                    status_error = ?,
                    last_checked_at = COALESCE(?, last_checked_at)
                WHERE streamer_id = ?
                "#
            )
                .bind(&patch.display_name)
                .bind(&patch.avatar_url)
                .bind(&patch.team)
                .bind(status.is_live as i64)
                .bind(&status.title)
                .bind(&status.game)
                .bind(status.viewer_count.map(|v| v as i64))
                .bind(&status.thumbnail_url)
                .bind(status.started_at)
                .bind(status.ended_at)
                .bind(status.last_live_date)
                .bind(status.error as i64)
                .bind(patch.last_checked_at)
                .bind(streamer_id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE streamers SET
                    display_name = COALESCE(?, display_name),
                    avatar_url = COALESCE(?, avatar_url),
                    team = COALESCE(?, team),
                    last_checked_at = COALESCE(?, last_checked_at)
                WHERE streamer_id = ?
                "#
            )
                .bind(&patch.display_name)
                .bind(&patch.avatar_url)
                .bind(&patch.team)
                .bind(patch.last_checked_at)
                .bind(streamer_id)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}
