use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::product::CatalogItem;

/// How guests get to the beach
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    SelfArrange,
    HotelPickup,
    Private,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::SelfArrange => "self_arrange",
            TransportType::HotelPickup => "hotel_pickup",
            TransportType::Private => "private",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "self_arrange" => Some(TransportType::SelfArrange),
            "hotel_pickup" => Some(TransportType::HotelPickup),
            "private" => Some(TransportType::Private),
            _ => None,
        }
    }
}

/// Transport details as chosen by the guest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportChoice {
    pub kind: TransportType,
    /// Companions riding along who do not take part in the activity
    #[serde(default)]
    pub non_player_count: u32,
    #[serde(default)]
    pub private_passengers: u32,
    #[serde(default)]
    pub hotel_name: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
}

impl TransportChoice {
    pub fn new(kind: TransportType) -> Self {
        Self {
            kind,
            non_player_count: 0,
            private_passengers: 0,
            hotel_name: None,
            room_number: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestCounts {
    pub adults: u32,
    pub children: u32,
}

/// An add-on line already resolved against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedAddon {
    pub addon_id: Uuid,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl PricedAddon {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Itemized price for one reservation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBreakdown {
    pub base: Decimal,
    pub child_base: Decimal,
    pub addons_total: Decimal,
    pub transport_cost: Decimal,
    /// Everything above, before any discount
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    /// Re-derive the total with a different discount. A discount can never
    /// push the charge below zero.
    pub fn with_discount(mut self, discount: Decimal) -> Self {
        let discount = discount.max(Decimal::ZERO);
        self.discount_amount = discount;
        self.total = (self.subtotal - discount).max(Decimal::ZERO);
        self
    }

    /// Round the discount to whole cents (half away from zero) and re-derive
    /// the total, so `discount_amount + total == subtotal` holds at the scale
    /// reservations are stored and charged at.
    pub fn rounded_to_cents(self) -> Self {
        let discount = self
            .discount_amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        self.with_discount(discount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat charge for a private transfer
    pub private_transport_surcharge: Decimal,

    /// Per-head charge for non-player companions
    pub non_player_fee: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            private_transport_surcharge: Decimal::from(2500),
            non_player_fee: Decimal::ZERO,
        }
    }
}

/// Pure pricing: no clock, no I/O, no hidden state.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn transport_cost(&self, transport: &TransportChoice) -> Decimal {
        let flat = match transport.kind {
            TransportType::Private => self.config.private_transport_surcharge,
            TransportType::SelfArrange | TransportType::HotelPickup => Decimal::ZERO,
        };

        flat + self.config.non_player_fee * Decimal::from(transport.non_player_count)
    }

    /// Compute the itemized total. Counts are assumed validated by the caller.
    pub fn compute_total(
        &self,
        item: &CatalogItem,
        guests: GuestCounts,
        addons: &[PricedAddon],
        transport: &TransportChoice,
        discount: Option<Decimal>,
    ) -> PriceBreakdown {
        let base = item.adult_price * Decimal::from(guests.adults);
        let child_base = item
            .child_price
            .map(|price| price * Decimal::from(guests.children))
            .unwrap_or(Decimal::ZERO);
        let addons_total: Decimal = addons.iter().map(PricedAddon::line_total).sum();
        let transport_cost = self.transport_cost(transport);
        let subtotal = base + child_base + addons_total + transport_cost;

        PriceBreakdown {
            base,
            child_base,
            addons_total,
            transport_cost,
            subtotal,
            discount_amount: Decimal::ZERO,
            total: subtotal,
        }
        .with_discount(discount.unwrap_or(Decimal::ZERO))
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
