use std::collections::HashMap;
use std::str::FromStr;

use offerdesk_core::pricing::OfferPricing;
use rust_decimal::Decimal;
use tera::Tera;

/// Register the custom filters used by offer templates.
///
/// - `money`: fixed-point display, e.g. `offer.offer_price | money(scale=price_scale)`.
///   Without `scale` it uses two places.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", money_filter);
}

/// Accepts decimal strings (how `Decimal` serializes) as well as JSON numbers.
/// Anything else renders as zero.
fn money_filter(value: &tera::Value, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(raw) => Decimal::from_str(raw.trim()).unwrap_or(Decimal::ZERO),
        tera::Value::Number(number) => {
            Decimal::from_str(&number.to_string()).unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    };
    let pricing = args
        .get("scale")
        .and_then(tera::Value::as_u64)
        .and_then(|scale| u32::try_from(scale).ok())
        .map(OfferPricing::new)
        .unwrap_or_default();
    Ok(tera::Value::String(pricing.format(amount)))
}
