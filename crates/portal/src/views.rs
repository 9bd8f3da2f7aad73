use offerdesk_core::domain::offer::{AcceptedOffer, Category, DraftOffer};
use offerdesk_core::manager::OfferEntryManager;
use rust_decimal::Decimal;
use serde::Serialize;

pub const EMPTY_STATE_MESSAGE: &str = "No offer products added yet.";
pub const PAGE_TITLE: &str = "Add Offer Product";

/// One accepted offer, shaped for the table and card templates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OfferRow {
    pub id: i64,
    pub name: String,
    pub product_id: String,
    pub category: &'static str,
    pub category_label: &'static str,
    pub original_price: Decimal,
    pub discount_percent: Option<String>,
    pub offer_price: Decimal,
    pub image_preview: String,
}

impl From<&AcceptedOffer> for OfferRow {
    fn from(offer: &AcceptedOffer) -> Self {
        Self {
            id: offer.id.0,
            name: offer.name.clone(),
            product_id: offer.product_id.clone(),
            category: offer.category.as_str(),
            category_label: offer.category.label(),
            original_price: offer.original_price,
            discount_percent: offer.discount_percent.map(|discount| discount.normalize().to_string()),
            offer_price: offer.offer_price,
            image_preview: offer.image_preview.as_str().to_string(),
        }
    }
}

pub fn offer_rows(offers: &[AcceptedOffer]) -> Vec<OfferRow> {
    offers.iter().map(OfferRow::from).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub fn category_options() -> Vec<CategoryOption> {
    Category::ALL
        .iter()
        .map(|category| CategoryOption { value: category.as_str(), label: category.label() })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DraftView {
    pub name: String,
    pub product_id: String,
    pub category: Option<&'static str>,
    pub original_price: String,
    pub discount_percent: String,
    pub offer_price: String,
    pub image_preview: Option<String>,
}

impl From<&DraftOffer> for DraftView {
    fn from(draft: &DraftOffer) -> Self {
        Self {
            name: draft.name.clone(),
            product_id: draft.product_id.clone(),
            category: draft.category.map(|category| category.as_str()),
            original_price: draft.original_price.clone(),
            discount_percent: draft.discount_percent.clone(),
            offer_price: draft.offer_price.clone(),
            image_preview: draft.image_preview.as_ref().map(|preview| preview.as_str().to_string()),
        }
    }
}

/// Everything the admin page shows at one moment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub title: &'static str,
    pub draft: DraftView,
    pub categories: Vec<CategoryOption>,
    pub alert: Option<&'static str>,
    pub loading_image: bool,
    pub preview_error: Option<String>,
    pub offers: Vec<OfferRow>,
}

impl PageView {
    pub fn from_manager(manager: &OfferEntryManager) -> Self {
        Self {
            title: PAGE_TITLE,
            draft: DraftView::from(manager.draft()),
            categories: category_options(),
            alert: manager.alert(),
            loading_image: manager.state().is_loading_image(),
            preview_error: manager.preview_error().map(|error| error.to_string()),
            offers: offer_rows(manager.offers().as_slice()),
        }
    }
}
