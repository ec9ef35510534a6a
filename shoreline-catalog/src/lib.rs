pub mod product;
pub mod pricing;
pub mod promo;

pub use product::{AddonItem, CatalogItem, CatalogRef};
pub use pricing::{
    GuestCounts, PriceBreakdown, PricedAddon, PricingConfig, PricingEngine, TransportChoice,
    TransportType,
};
pub use promo::{
    DiscountType, PromoApplication, PromoCode, PromoDescriptor, PromoRejection, PromoValidator,
};
