//! nowtify-core/src/repositories/sqlite/team_logos.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use nowtify_common::traits::repository_traits::TeamLogoRepository;

use crate::Error;

#[derive(Clone)]
pub struct SqliteTeamLogoRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTeamLogoRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamLogoRepository for SqliteTeamLogoRepository {
    /// Outer `None`: never looked up. `Some(None)`: looked up, nothing found.
    async fn get(&self, team: &str) -> Result<Option<Option<String>>, Error> {
        let row = sqlx::query("SELECT logo_url FROM team_logos WHERE team = ?")
            .bind(team)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(r.try_get("logo_url")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, team: &str, logo_url: Option<&str>) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO team_logos (team, logo_url, resolved_at)
            VALUES (?, ?, ?)
            ON CONFLICT (team) DO UPDATE SET
                logo_url = excluded.logo_url,
                resolved_at = excluded.resolved_at
            "#
        )
            .bind(team)
            .bind(logo_url)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, team: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM team_logos WHERE team = ?")
            .bind(team)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
