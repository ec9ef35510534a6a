use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable beach-day package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    /// Price per adult guest
    pub adult_price: Decimal,
    /// Price per child guest; packages without one do not charge for children
    pub child_price: Option<Decimal>,
    pub includes_meal: bool,
    pub includes_transfer: bool,
    pub is_active: bool,
}

/// Optional extra sold per unit (jet ski slot, massage, towel set...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddonItem {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub unit_price: Decimal,
    pub unit_label: String,
    pub is_active: bool,
}

/// How a client refers to a catalog entry: internal key or human-readable slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogRef {
    Id(Uuid),
    Slug(String),
}

impl CatalogRef {
    /// Anything that parses as a UUID is an id; everything else is a slug.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => CatalogRef::Id(id),
            Err(_) => CatalogRef::Slug(raw.to_lowercase()),
        }
    }

    pub fn matches_item(&self, item: &CatalogItem) -> bool {
        match self {
            CatalogRef::Id(id) => item.id == *id,
            CatalogRef::Slug(slug) => item.slug == *slug,
        }
    }

    pub fn matches_addon(&self, addon: &AddonItem) -> bool {
        match self {
            CatalogRef::Id(id) => addon.id == *id,
            CatalogRef::Slug(slug) => addon.slug == *slug,
        }
    }
}

impl std::fmt::Display for CatalogRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogRef::Id(id) => write!(f, "{}", id),
            CatalogRef::Slug(slug) => write!(f, "{}", slug),
        }
    }
}
