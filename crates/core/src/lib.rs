pub mod audit;
pub mod config;
pub mod domain;
pub mod editor;
pub mod errors;
pub mod manager;
pub mod offers;
pub mod preview;
pub mod pricing;
pub mod submission;

pub use domain::offer::{AcceptedOffer, Category, DraftOffer, ImageFile, ImagePreview, OfferId};
pub use editor::{DraftAction, DraftEditor, DraftField, EditorError, EditorPhase, PreviewTicket};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use manager::{FileSelection, ImageCompletion, ManagerSettings, OfferEntryManager};
pub use offers::OfferList;
pub use preview::{DataUrlDecoder, ImageDecoder, PreviewError};
pub use pricing::OfferPricing;
pub use submission::{SubmissionGate, ValidationError, VALIDATION_ALERT};
