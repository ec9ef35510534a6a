use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shoreline_catalog::{DiscountType, PromoCode};
use shoreline_core::repository::{PromoRepository, Redemption, StoreError, StoreResult};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

pub struct PgPromoRepository {
    pool: PgPool,
}

impl PgPromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PromoRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount_value: Decimal,
    min_order_value: Option<Decimal>,
    usage_cap: Option<i32>,
    usage_count: i32,
    is_active: bool,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<PromoRow> for PromoCode {
    type Error = StoreError;

    fn try_from(row: PromoRow) -> Result<Self, Self::Error> {
        let discount_type = DiscountType::parse(&row.discount_type).ok_or_else(|| StoreError::Corrupt {
            table: "promo_codes",
            detail: format!("unknown discount_type {}", row.discount_type),
        })?;

        Ok(PromoCode {
            id: row.id,
            code: row.code,
            discount_type,
            discount_value: row.discount_value,
            min_order_value: row.min_order_value,
            usage_cap: row.usage_cap,
            usage_count: row.usage_count,
            is_active: row.is_active,
            starts_at: row.starts_at,
            expires_at: row.expires_at,
        })
    }
}

const PROMO_COLUMNS: &str = "id, code, discount_type, discount_value, min_order_value, usage_cap, usage_count, is_active, starts_at, expires_at";

#[async_trait]
impl PromoRepository for PgPromoRepository {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<PromoCode>> {
        // Prefer the active row; inactive duplicates may share a code
        let row = sqlx::query_as::<_, PromoRow>(&format!(
            "SELECT {} FROM promo_codes WHERE UPPER(code) = $1 ORDER BY is_active DESC, created_at DESC LIMIT 1",
            PROMO_COLUMNS
        ))
        .bind(PromoCode::normalize(code))
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(PromoCode::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoRow>(&format!(
            "SELECT {} FROM promo_codes WHERE id = $1",
            PROMO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(PromoCode::try_from).transpose()
    }

    async fn redeem(&self, promo_id: Uuid, reservation_id: Uuid) -> StoreResult<Redemption> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let ledger = sqlx::query(
            r#"
            INSERT INTO promo_redemptions (reservation_id, promo_code_id)
            VALUES ($1, $2)
            ON CONFLICT (reservation_id) DO NOTHING
            "#,
        )
        .bind(reservation_id)
        .bind(promo_id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        if ledger.rows_affected() == 0 {
            tx.rollback().await.map_err(StoreError::backend)?;
            info!(%promo_id, %reservation_id, "Promo already redeemed for reservation");
            return Ok(Redemption::AlreadyRedeemed);
        }

        // Single conditional increment; the row lock serializes concurrent redeemers
        let counter = sqlx::query(
            r#"
            UPDATE promo_codes
            SET usage_count = usage_count + 1
            WHERE id = $1 AND (usage_cap IS NULL OR usage_count < usage_cap)
            "#,
        )
        .bind(promo_id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        if counter.rows_affected() == 0 {
            tx.rollback().await.map_err(StoreError::backend)?;
            warn!(%promo_id, %reservation_id, "Promo usage cap reached at redemption");
            return Ok(Redemption::CapReached);
        }

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(Redemption::Redeemed)
    }
}
