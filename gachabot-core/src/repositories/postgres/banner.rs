// gachabot-core/src/repositories/postgres/banner.rs
//
// Banner rows are keyed by the storefront's pack_id. The upsert is a
// deliberate full-row replace: every reconcile pass supplies a complete
// record, so each field is enumerated in the ON CONFLICT clause rather than
// diffed. Retirement only ever flips is_active off; rows are never deleted.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use gachabot_common::models::Banner;
use gachabot_common::traits::repository_traits::BannerRepository;
use gachabot_common::Error;

#[derive(Clone)]
pub struct PostgresBannerRepository {
    pool: Pool<Postgres>,
}

impl PostgresBannerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_banner(r: &sqlx::postgres::PgRow) -> Result<Banner, Error> {
    Ok(Banner {
        pack_id: r.try_get("pack_id")?,
        category: r.try_get("category")?,
        title: r.try_get("title")?,
        best_hit: r.try_get("best_hit")?,
        price: r.try_get("price")?,
        current_stock: r.try_get("current_stock")?,
        total_stock: r.try_get("total_stock")?,
        daily_limit: r.try_get("daily_limit")?,
        sale_end_date: r.try_get("sale_end_date")?,
        image_url: r.try_get("image_url")?,
        detail_url: r.try_get("detail_url")?,
        is_active: r.try_get("is_active")?,
        not_found_count: r.try_get("not_found_count")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

const BANNER_COLUMNS: &str = r#"
    pack_id, category, title, best_hit, price, current_stock, total_stock,
    daily_limit, sale_end_date, image_url, detail_url, is_active,
    not_found_count, created_at, updated_at
"#;

#[async_trait]
impl BannerRepository for PostgresBannerRepository {
    async fn get(&self, pack_id: i64) -> Result<Option<Banner>, Error> {
        let q = format!("SELECT {BANNER_COLUMNS} FROM banners WHERE pack_id = $1");
        let row_opt = sqlx::query(&q)
            .bind(pack_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_banner(&r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, banner: &Banner) -> Result<(), Error> {
        let q = r#"
            INSERT INTO banners
                (pack_id, category, title, best_hit, price, current_stock,
                 total_stock, daily_limit, sale_end_date, image_url, detail_url,
                 is_active, not_found_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (pack_id)
            DO UPDATE SET category = EXCLUDED.category,
                          title = EXCLUDED.title,
                          best_hit = EXCLUDED.best_hit,
                          price = EXCLUDED.price,
                          current_stock = EXCLUDED.current_stock,
                          total_stock = EXCLUDED.total_stock,
                          daily_limit = EXCLUDED.daily_limit,
                          sale_end_date = EXCLUDED.sale_end_date,
                          image_url = EXCLUDED.image_url,
                          detail_url = EXCLUDED.detail_url,
                          is_active = EXCLUDED.is_active,
                          not_found_count = EXCLUDED.not_found_count,
                          updated_at = now()
        "#;
        sqlx::query(q)
            .bind(banner.pack_id)
            .bind(&banner.category)
            .bind(&banner.title)
            .bind(&banner.best_hit)
            .bind(banner.price)
            .bind(banner.current_stock)
            .bind(banner.total_stock)
            .bind(banner.daily_limit)
            .bind(&banner.sale_end_date)
            .bind(&banner.image_url)
            .bind(&banner.detail_url)
            .bind(banner.is_active)
            .bind(banner.not_found_count)
            .bind(banner.created_at)
            .bind(banner.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_stock(&self, pack_id: i64, new_stock: i32) -> Result<(), Error> {
        sqlx::query("UPDATE banners SET current_stock = $1, updated_at = now() WHERE pack_id = $2")
            .bind(new_stock)
            .bind(pack_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_daily_limit(&self, pack_id: i64, daily_limit: Option<i32>) -> Result<(), Error> {
        sqlx::query("UPDATE banners SET daily_limit = $1, updated_at = now() WHERE pack_id = $2")
            .bind(daily_limit)
            .bind(pack_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_inactive(&self, pack_id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE banners SET is_active = FALSE, updated_at = now() WHERE pack_id = $1")
            .bind(pack_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Banner>, Error> {
        let q = format!("SELECT {BANNER_COLUMNS} FROM banners WHERE is_active = TRUE ORDER BY pack_id");
        let rows = sqlx::query(&q).fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_banner(&r)?);
        }
        Ok(out)
    }

    async fn reset_not_found(&self, pack_id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE banners SET not_found_count = 0 WHERE pack_id = $1")
            .bind(pack_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_not_found(&self, pack_id: i64) -> Result<i32, Error> {
        let row = sqlx::query(
            "UPDATE banners SET not_found_count = not_found_count + 1 \
             WHERE pack_id = $1 RETURNING not_found_count",
        )
        .bind(pack_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("not_found_count")?)
    }

    async fn count_active(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM banners WHERE is_active = TRUE")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}
