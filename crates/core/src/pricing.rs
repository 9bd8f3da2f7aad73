use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRICE_SCALE: u32 = 2;
pub const MAX_PRICE_SCALE: u32 = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferPriceBreakdown {
    pub original_price: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub offer_price: Decimal,
    pub steps: Vec<PricingTraceStep>,
}

/// Derives the offer price from an original price and a discount percentage.
///
/// Results are rounded half away from zero to `scale` places, which is how the
/// storefront displays prices (`899.991` shows as `899.99`, `0.125` as `0.13`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfferPricing {
    scale: u32,
}

impl Default for OfferPricing {
    fn default() -> Self {
        Self { scale: DEFAULT_PRICE_SCALE }
    }
}

impl OfferPricing {
    pub fn new(scale: u32) -> Self {
        Self { scale: scale.min(MAX_PRICE_SCALE) }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// `None` when the arithmetic overflows; callers leave the previous value alone.
    pub fn derive(&self, original_price: Decimal, discount_percent: Decimal) -> Option<Decimal> {
        self.breakdown(original_price, discount_percent).map(|breakdown| breakdown.offer_price)
    }

    pub fn breakdown(
        &self,
        original_price: Decimal,
        discount_percent: Decimal,
    ) -> Option<OfferPriceBreakdown> {
        let discount_amount =
            original_price.checked_mul(discount_percent)?.checked_div(Decimal::ONE_HUNDRED)?;
        let offer_price = original_price
            .checked_sub(discount_amount)?
            .round_dp_with_strategy(self.scale, RoundingStrategy::MidpointAwayFromZero);

        Some(OfferPriceBreakdown {
            original_price,
            discount_percent,
            discount_amount,
            offer_price,
            steps: vec![
                PricingTraceStep {
                    stage: "discount".to_string(),
                    detail: "original_price * discount_percent / 100".to_string(),
                    amount: discount_amount,
                },
                PricingTraceStep {
                    stage: "offer_price".to_string(),
                    detail: format!("round(original_price - discount, {})", self.scale),
                    amount: offer_price,
                },
            ],
        })
    }

    /// Fixed-point text with exactly `scale` decimals, e.g. `800.00`.
    pub fn format(&self, amount: Decimal) -> String {
        let mut rounded =
            amount.round_dp_with_strategy(self.scale, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(self.scale);
        rounded.to_string()
    }

    /// Recomputes the display text of the offer price from raw form input. Missing or
    /// non-numeric input counts as zero.
    pub fn recompute(&self, original_raw: &str, discount_raw: &str) -> Option<String> {
        self.derive(parse_lenient(original_raw), parse_lenient(discount_raw))
            .map(|price| self.format(price))
    }
}

/// Parses form text as a decimal, treating blank or malformed input as zero.
pub fn parse_lenient(raw: &str) -> Decimal {
    parse_decimal(raw).unwrap_or(Decimal::ZERO)
}

pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// A present, non-negative amount. Used by the submission gate.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    parse_decimal(raw).filter(|value| !value.is_sign_negative() || value.is_zero())
}
