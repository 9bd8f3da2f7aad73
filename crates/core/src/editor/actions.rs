use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::offer::{AcceptedOffer, ImageFile, ImagePreview, OfferId};
use crate::editor::EditorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Name,
    ProductId,
    Category,
    OriginalPrice,
    DiscountPercent,
    OfferPrice,
}

impl DraftField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ProductId => "productId",
            Self::Category => "category",
            Self::OriginalPrice => "originalPrice",
            Self::DiscountPercent => "discountPercent",
            Self::OfferPrice => "offerPrice",
        }
    }

    pub fn drives_offer_price(&self) -> bool {
        matches!(self, Self::OriginalPrice | Self::DiscountPercent)
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DraftField {
    type Err = EditorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "name" => Ok(Self::Name),
            "productId" | "product_id" => Ok(Self::ProductId),
            "category" => Ok(Self::Category),
            "originalPrice" | "original_price" => Ok(Self::OriginalPrice),
            "discountPercent" | "discount_percent" => Ok(Self::DiscountPercent),
            "offerPrice" | "offer_price" => Ok(Self::OfferPrice),
            other => Err(EditorError::UnknownField(other.to_string())),
        }
    }
}

/// Generation number of an image load. Only the most recent ticket may write the
/// image fields; reset and newer selections retire older tickets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PreviewTicket(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorPhase {
    Idle,
    Editing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftAction {
    UpdateField { field: DraftField, value: String },
    ImageLoaded { ticket: PreviewTicket, image: ImageFile, preview: ImagePreview },
    Submit { id: OfferId, created_at: DateTime<Utc> },
    Reset,
}

impl DraftAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::UpdateField { .. } => ActionKind::UpdateField,
            Self::ImageLoaded { .. } => ActionKind::ImageLoaded,
            Self::Submit { .. } => ActionKind::Submit,
            Self::Reset => ActionKind::Reset,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    UpdateField,
    ImageLoaded,
    Submit,
    Reset,
}

/// Work the owner of the editor must carry out after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorEffect {
    OfferPriceRecomputed { offer_price: String },
    /// Recompute produced no number; the previous offer price stands.
    OfferPriceKept,
    ImageApplied { ticket: PreviewTicket },
    StaleImageDiscarded { ticket: PreviewTicket, current: PreviewTicket },
    AcceptOffer(Box<AcceptedOffer>),
    ClearFileSelection,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: EditorPhase,
    pub to: EditorPhase,
    pub action: ActionKind,
    pub effects: Vec<EditorEffect>,
}

impl TransitionOutcome {
    pub fn accepted_offer(&self) -> Option<&AcceptedOffer> {
        self.effects.iter().find_map(|effect| match effect {
            EditorEffect::AcceptOffer(offer) => Some(offer.as_ref()),
            _ => None,
        })
    }
}
