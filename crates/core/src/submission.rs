use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::offer::{AcceptedOffer, DraftOffer, OfferId};
use crate::pricing::{parse_amount, parse_decimal};

/// Alert shown for every rejected submission. It deliberately names no field.
pub const VALIDATION_ALERT: &str = "Please fill all required fields and upload an image.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Name,
    ProductId,
    Category,
    OriginalPrice,
    DiscountPercent,
    OfferPrice,
    Image,
}

impl RequiredField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ProductId => "product_id",
            Self::Category => "category",
            Self::OriginalPrice => "original_price",
            Self::DiscountPercent => "discount_percent",
            Self::OfferPrice => "offer_price",
            Self::Image => "image_preview",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("submission rejected; missing required fields: {missing_fields:?}")]
pub struct ValidationError {
    pub missing_fields: Vec<RequiredField>,
}

impl ValidationError {
    pub fn alert(&self) -> &'static str {
        VALIDATION_ALERT
    }
}

/// Decides whether a draft may become an accepted offer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmissionGate {
    require_discount: bool,
}

impl SubmissionGate {
    pub fn new(require_discount: bool) -> Self {
        Self { require_discount }
    }

    pub fn missing_fields(&self, draft: &DraftOffer) -> Vec<RequiredField> {
        let mut missing = Vec::new();
        if draft.name.trim().is_empty() {
            missing.push(RequiredField::Name);
        }
        if draft.product_id.trim().is_empty() {
            missing.push(RequiredField::ProductId);
        }
        if draft.category.is_none() {
            missing.push(RequiredField::Category);
        }
        if parse_amount(&draft.original_price).is_none() {
            missing.push(RequiredField::OriginalPrice);
        }
        if self.require_discount && parse_amount(&draft.discount_percent).is_none() {
            missing.push(RequiredField::DiscountPercent);
        }
        // Presence only: a discount above 100% derives a negative offer price.
        if parse_decimal(&draft.offer_price).is_none() {
            missing.push(RequiredField::OfferPrice);
        }
        if draft.image_preview.is_none() || draft.image.is_none() {
            missing.push(RequiredField::Image);
        }
        missing
    }

    pub fn submit(
        &self,
        draft: &DraftOffer,
        id: OfferId,
        created_at: DateTime<Utc>,
    ) -> Result<AcceptedOffer, ValidationError> {
        let missing_fields = self.missing_fields(draft);
        if !missing_fields.is_empty() {
            return Err(ValidationError { missing_fields });
        }

        let (
            Some(category),
            Some(original_price),
            Some(offer_price),
            Some(image),
            Some(image_preview),
        ) = (
            draft.category,
            parse_amount(&draft.original_price),
            parse_decimal(&draft.offer_price),
            draft.image.clone(),
            draft.image_preview.clone(),
        )
        else {
            return Err(ValidationError { missing_fields: self.missing_fields(draft) });
        };

        Ok(AcceptedOffer {
            id,
            name: draft.name.trim().to_string(),
            product_id: draft.product_id.trim().to_string(),
            category,
            original_price,
            discount_percent: parse_decimal(&draft.discount_percent),
            offer_price,
            image,
            image_preview,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{RequiredField, SubmissionGate, VALIDATION_ALERT};
    use crate::domain::offer::{Category, DraftOffer, ImageFile, ImagePreview, OfferId};

    fn complete_draft() -> DraftOffer {
        DraftOffer {
            name: "Denim Jacket".to_string(),
            product_id: "JKT-001".to_string(),
            category: Some(Category::Jackets),
            original_price: "1000".to_string(),
            discount_percent: "20".to_string(),
            offer_price: "800.00".to_string(),
            image: Some(ImageFile::new("jacket.png", vec![1, 2, 3])),
            image_preview: Some(ImagePreview("data:image/png;base64,AQID".to_string())),
        }
    }

    #[test]
    fn complete_draft_is_accepted() {
        let offer = SubmissionGate::default()
            .submit(&complete_draft(), OfferId(1_730_000_000_000), Utc::now())
            .expect("complete draft should be accepted");

        assert_eq!(offer.id, OfferId(1_730_000_000_000));
        assert_eq!(offer.category, Category::Jackets);
        assert_eq!(offer.original_price, Decimal::from(1000));
        assert_eq!(offer.discount_percent, Some(Decimal::from(20)));
        assert_eq!(offer.offer_price, Decimal::new(80000, 2));
    }

    #[test]
    fn each_required_field_blocks_submission() {
        let gate = SubmissionGate::default();
        let fields = [
            RequiredField::Name,
            RequiredField::ProductId,
            RequiredField::Category,
            RequiredField::OriginalPrice,
            RequiredField::OfferPrice,
            RequiredField::Image,
        ];

        for field in fields {
            let mut draft = complete_draft();
            match field {
                RequiredField::Name => draft.name = "  ".to_string(),
                RequiredField::ProductId => draft.product_id.clear(),
                RequiredField::Category => draft.category = None,
                RequiredField::OriginalPrice => draft.original_price.clear(),
                RequiredField::OfferPrice => draft.offer_price = "oops".to_string(),
                RequiredField::Image => draft.image_preview = None,
                RequiredField::DiscountPercent => draft.discount_percent.clear(),
            }
            let error = gate
                .submit(&draft, OfferId(1), Utc::now())
                .expect_err("incomplete draft should be rejected");
            assert_eq!(error.missing_fields, vec![field]);
            assert_eq!(error.alert(), VALIDATION_ALERT);
        }
    }

    #[test]
    fn discount_is_optional_unless_configured() {
        let mut draft = complete_draft();
        draft.discount_percent.clear();

        let offer = SubmissionGate::default()
            .submit(&draft, OfferId(7), Utc::now())
            .expect("discount is optional by default");
        assert_eq!(offer.discount_percent, None);

        let error = SubmissionGate::new(true)
            .submit(&draft, OfferId(8), Utc::now())
            .expect_err("discount required when configured");
        assert_eq!(error.missing_fields, vec![RequiredField::DiscountPercent]);
    }

    #[test]
    fn negative_derived_offer_price_is_present() {
        let mut draft = complete_draft();
        draft.original_price = "100".to_string();
        draft.discount_percent = "150".to_string();
        draft.offer_price = "-50.00".to_string();

        let offer = SubmissionGate::default()
            .submit(&draft, OfferId(9), Utc::now())
            .expect("discount above 100% still submits");
        assert_eq!(offer.offer_price, Decimal::new(-5000, 2));
        assert_eq!(offer.discount_percent, Some(Decimal::from(150)));

        draft.original_price = "-1".to_string();
        let error = SubmissionGate::default()
            .submit(&draft, OfferId(10), Utc::now())
            .expect_err("negative original price is not a valid amount");
        assert_eq!(error.missing_fields, vec![RequiredField::OriginalPrice]);
    }

    #[test]
    fn alert_text_never_names_a_field() {
        let error = SubmissionGate::default()
            .submit(&DraftOffer::default(), OfferId(1), Utc::now())
            .expect_err("blank draft rejected");
        assert_eq!(error.missing_fields.len(), 6);
        for field in &error.missing_fields {
            assert!(!error.alert().contains(field.as_str()));
        }
    }
}
