// gachabot-core/src/repositories/postgres/pack_history.rs
//
// Append-only. There is deliberately no update or delete here.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use gachabot_common::models::PackHistory;
use gachabot_common::traits::repository_traits::PackHistoryRepository;
use gachabot_common::Error;

#[derive(Clone)]
pub struct PostgresPackHistoryRepository {
    pool: Pool<Postgres>,
}

impl PostgresPackHistoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackHistoryRepository for PostgresPackHistoryRepository {
    async fn append(&self, entry: &PackHistory) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO pack_history (id, banner_id, old_count, new_count, changed_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(entry.banner_id)
        .bind(entry.old_count)
        .bind(entry.new_count)
        .bind(entry.changed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_banner(&self, banner_id: i64) -> Result<Vec<PackHistory>, Error> {
        let rows = sqlx::query(
            "SELECT id, banner_id, old_count, new_count, changed_at \
             FROM pack_history WHERE banner_id = $1 ORDER BY changed_at",
        )
        .bind(banner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(PackHistory {
                id: r.try_get("id")?,
                banner_id: r.try_get("banner_id")?,
                old_count: r.try_get("old_count")?,
                new_count: r.try_get("new_count")?,
                changed_at: r.try_get("changed_at")?,
            });
        }
        Ok(out)
    }
}
