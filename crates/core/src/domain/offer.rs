use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub i64);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tshirts,
    Jackets,
    Hoodies,
    Kids,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Tshirts, Self::Jackets, Self::Hoodies, Self::Kids];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tshirts => "tshirts",
            Self::Jackets => "jackets",
            Self::Hoodies => "hoodies",
            Self::Kids => "kids",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tshirts => "T-Shirts",
            Self::Jackets => "Jackets",
            Self::Hoodies => "Hoodies",
            Self::Kids => "Kids",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tshirts" => Ok(Self::Tshirts),
            "jackets" => Ok(Self::Jackets),
            "hoodies" => Ok(Self::Hoodies),
            "kids" => Ok(Self::Kids),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A file picked through the image input. The bytes are shared so that cloning a
/// draft (or an accepted offer) never copies the payload.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ImageFile {
    pub file_name: String,
    pub media_type: Option<String>,
    pub size: usize,
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self { file_name: file_name.into(), media_type: None, size: bytes.len(), bytes }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.size)
            .finish()
    }
}

/// `data:<media type>;base64,<payload>` suitable for an `<img src>` attribute.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImagePreview(pub String);

impl ImagePreview {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImagePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(32).collect();
        write!(f, "ImagePreview({head}.. {} chars)", self.0.len())
    }
}

/// The in-progress form. Numeric fields keep the raw text the user typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DraftOffer {
    pub name: String,
    pub product_id: String,
    pub category: Option<Category>,
    pub original_price: String,
    pub discount_percent: String,
    pub offer_price: String,
    pub image: Option<ImageFile>,
    pub image_preview: Option<ImagePreview>,
}

impl DraftOffer {
    pub fn is_blank(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AcceptedOffer {
    pub id: OfferId,
    pub name: String,
    pub product_id: String,
    pub category: Category,
    pub original_price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub offer_price: Decimal,
    pub image: ImageFile,
    pub image_preview: ImagePreview,
    pub created_at: DateTime<Utc>,
}
