use async_trait::async_trait;
use rust_decimal::Decimal;
use shoreline_catalog::{AddonItem, CatalogItem, CatalogRef};
use shoreline_core::repository::{CatalogRepository, StoreError, StoreResult};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CatalogItemRow {
    id: Uuid,
    slug: String,
    name: String,
    adult_price: Decimal,
    child_price: Option<Decimal>,
    includes_meal: bool,
    includes_transfer: bool,
    is_active: bool,
}

impl From<CatalogItemRow> for CatalogItem {
    fn from(row: CatalogItemRow) -> Self {
        CatalogItem {
            id: row.id,
            slug: row.slug,
            name: row.name,
            adult_price: row.adult_price,
            child_price: row.child_price,
            includes_meal: row.includes_meal,
            includes_transfer: row.includes_transfer,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AddonRow {
    id: Uuid,
    slug: String,
    name: String,
    unit_price: Decimal,
    unit_label: String,
    is_active: bool,
}

impl From<AddonRow> for AddonItem {
    fn from(row: AddonRow) -> Self {
        AddonItem {
            id: row.id,
            slug: row.slug,
            name: row.name,
            unit_price: row.unit_price,
            unit_label: row.unit_label,
            is_active: row.is_active,
        }
    }
}

const ITEM_COLUMNS: &str =
    "id, slug, name, adult_price, child_price, includes_meal, includes_transfer, is_active";

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn find_item(&self, item_ref: &CatalogRef) -> StoreResult<Option<CatalogItem>> {
        let row = match item_ref {
            CatalogRef::Id(id) => {
                sqlx::query_as::<_, CatalogItemRow>(&format!(
                    "SELECT {} FROM catalog_items WHERE id = $1",
                    ITEM_COLUMNS
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
            }
            CatalogRef::Slug(slug) => {
                sqlx::query_as::<_, CatalogItemRow>(&format!(
                    "SELECT {} FROM catalog_items WHERE slug = $1",
                    ITEM_COLUMNS
                ))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(StoreError::backend)?;

        Ok(row.map(CatalogItem::from))
    }

    async fn find_addons(&self, refs: &[CatalogRef]) -> StoreResult<Vec<AddonItem>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<Uuid> = Vec::new();
        let mut slugs: Vec<String> = Vec::new();
        for r in refs {
            match r {
                CatalogRef::Id(id) => ids.push(*id),
                CatalogRef::Slug(slug) => slugs.push(slug.clone()),
            }
        }

        let rows = sqlx::query_as::<_, AddonRow>(
            r#"
            SELECT id, slug, name, unit_price, unit_label, is_active
            FROM addon_items
            WHERE id = ANY($1) OR slug = ANY($2)
            "#,
        )
        .bind(&ids)
        .bind(&slugs)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(AddonItem::from).collect())
    }
}
