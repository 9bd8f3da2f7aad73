use offerdesk_core::config::{AppConfig, LoadOptions};
use offerdesk_core::errors::ApplicationError;
use offerdesk_core::pricing::{parse_amount, OfferPricing};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct PriceOutput {
    original_price: String,
    discount_percent: String,
    discount_amount: String,
    offer_price: String,
    scale: u32,
}

pub fn run(options: &LoadOptions, original: &str, discount: &str) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::from_error(
                "price",
                "config_validation",
                ApplicationError::Configuration(error.to_string()),
                2,
            );
        }
    };

    let Some(original_price) = parse_amount(original) else {
        return invalid_input(format!("original price `{original}` is not a non-negative number"));
    };
    let Some(discount_percent) = parse_amount(discount) else {
        return invalid_input(format!("discount percent `{discount}` is not a non-negative number"));
    };

    let pricing = OfferPricing::new(config.pricing.scale);
    let Some(breakdown) = pricing.breakdown(original_price, discount_percent) else {
        return CommandResult::from_error(
            "price",
            "arithmetic_overflow",
            ApplicationError::Input("offer price could not be derived without overflowing".into()),
            4,
        );
    };

    let output = PriceOutput {
        original_price: pricing.format(breakdown.original_price),
        discount_percent: breakdown.discount_percent.normalize().to_string(),
        discount_amount: pricing.format(breakdown.discount_amount),
        offer_price: pricing.format(breakdown.offer_price),
        scale: pricing.scale(),
    };
    let message = format!("offer price is {}", output.offer_price);
    CommandResult::success_with_details("price", message, output)
}

fn invalid_input(message: String) -> CommandResult {
    CommandResult::from_error("price", "invalid_input", ApplicationError::Input(message), 3)
}
