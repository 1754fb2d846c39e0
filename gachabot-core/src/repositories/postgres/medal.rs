// gachabot-core/src/repositories/postgres/medal.rs
//
// The claim race is decided here: try_claim is one INSERT against the
// (thread_id, tier) unique constraint. Concurrent claims for the same tier
// collide in Postgres, and exactly one caller sees Claimed.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use gachabot_common::models::{ClaimOutcome, Medal, MedalTier};
use gachabot_common::traits::repository_traits::MedalRepository;
use gachabot_common::{DuplicateKind, Error};

use super::map_unique_violation;

#[derive(Clone)]
pub struct PostgresMedalRepository {
    pool: Pool<Postgres>,
}

impl PostgresMedalRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_medal(r: &sqlx::postgres::PgRow) -> Result<Medal, Error> {
    let tier_str: String = r.try_get("tier")?;
    let tier = MedalTier::parse(&tier_str)
        .ok_or_else(|| Error::Parse(format!("unknown medal tier '{tier_str}'")))?;
    Ok(Medal {
        id: r.try_get("id")?,
        thread_id: r.try_get("thread_id")?,
        tier,
        user_id: r.try_get("user_id")?,
        claimed_at: r.try_get("claimed_at")?,
    })
}

#[async_trait]
impl MedalRepository for PostgresMedalRepository {
    async fn try_claim(
        &self,
        thread_id: i64,
        tier: MedalTier,
        user_id: i64,
    ) -> Result<ClaimOutcome, Error> {
        let medal = Medal::new(thread_id, tier, user_id);
        let result = sqlx::query(
            "INSERT INTO medals (id, thread_id, tier, user_id, claimed_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(medal.id)
        .bind(medal.thread_id)
        .bind(medal.tier.as_str())
        .bind(medal.user_id)
        .bind(medal.claimed_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(ClaimOutcome::Claimed),
            Err(e) => match map_unique_violation(e, DuplicateKind::Medal) {
                Error::Duplicate(_) => {
                    // Lost the race; report who holds the tier.
                    let holder = self
                        .get(thread_id, tier)
                        .await?
                        .map(|m| m.user_id)
                        .unwrap_or(Medal::UNKNOWN_USER);
                    Ok(ClaimOutcome::AlreadyClaimed { user_id: holder })
                }
                other => Err(other),
            },
        }
    }

    async fn get(&self, thread_id: i64, tier: MedalTier) -> Result<Option<Medal>, Error> {
        let row_opt = sqlx::query(
            "SELECT id, thread_id, tier, user_id, claimed_at FROM medals \
             WHERE thread_id = $1 AND tier = $2",
        )
        .bind(thread_id)
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_medal(&r)?)),
            None => Ok(None),
        }
    }

    async fn count_for_thread(&self, thread_id: i64) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM medals WHERE thread_id = $1")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    async fn count(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM medals")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}
