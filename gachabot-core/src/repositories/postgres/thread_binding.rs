// gachabot-core/src/repositories/postgres/thread_binding.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use gachabot_common::models::ThreadBinding;
use gachabot_common::traits::repository_traits::ThreadBindingRepository;
use gachabot_common::{DuplicateKind, Error};

use super::map_unique_violation;

#[derive(Clone)]
pub struct PostgresThreadBindingRepository {
    pool: Pool<Postgres>,
}

impl PostgresThreadBindingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_binding(r: &sqlx::postgres::PgRow) -> Result<ThreadBinding, Error> {
    Ok(ThreadBinding {
        id: r.try_get("id")?,
        banner_id: r.try_get("banner_id")?,
        thread_id: r.try_get("thread_id")?,
        channel_id: r.try_get("channel_id")?,
        starter_message_id: r.try_get("starter_message_id")?,
        probability_message_id: r.try_get("probability_message_id")?,
        is_expired: r.try_get("is_expired")?,
        created_at: r.try_get("created_at")?,
    })
}

const BINDING_COLUMNS: &str = r#"
    id, banner_id, thread_id, channel_id, starter_message_id,
    probability_message_id, is_expired, created_at
"#;

#[async_trait]
impl ThreadBindingRepository for PostgresThreadBindingRepository {
    async fn create(&self, binding: &ThreadBinding) -> Result<(), Error> {
        let q = r#"
            INSERT INTO thread_bindings
                (id, banner_id, thread_id, channel_id, starter_message_id,
                 probability_message_id, is_expired, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;
        sqlx::query(q)
            .bind(binding.id)
            .bind(binding.banner_id)
            .bind(binding.thread_id)
            .bind(binding.channel_id)
            .bind(binding.starter_message_id)
            .bind(binding.probability_message_id)
            .bind(binding.is_expired)
            .bind(binding.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, DuplicateKind::ThreadBinding))?;
        Ok(())
    }

    async fn get_by_banner(&self, banner_id: i64) -> Result<Option<ThreadBinding>, Error> {
        let q = format!("SELECT {BINDING_COLUMNS} FROM thread_bindings WHERE banner_id = $1");
        let row_opt = sqlx::query(&q)
            .bind(banner_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_binding(&r)?)),
            None => Ok(None),
        }
    }

    async fn get_by_thread(&self, thread_id: i64) -> Result<Option<ThreadBinding>, Error> {
        let q = format!("SELECT {BINDING_COLUMNS} FROM thread_bindings WHERE thread_id = $1");
        let row_opt = sqlx::query(&q)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_binding(&r)?)),
            None => Ok(None),
        }
    }

    async fn set_probability_message(&self, banner_id: i64, message_id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE thread_bindings SET probability_message_id = $1 WHERE banner_id = $2")
            .bind(message_id)
            .bind(banner_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_expired(&self, banner_id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE thread_bindings SET is_expired = TRUE WHERE banner_id = $1")
            .bind(banner_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_unexpired(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM thread_bindings WHERE is_expired = FALSE")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}
