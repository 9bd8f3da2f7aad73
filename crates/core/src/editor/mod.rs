pub mod actions;
pub mod reducer;

use thiserror::Error;

use crate::submission::ValidationError;

pub use actions::{
    ActionKind, DraftAction, DraftField, EditorEffect, EditorPhase, PreviewTicket,
    TransitionOutcome,
};
pub use reducer::{DraftEditor, EditorState};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("unknown draft field `{0}`")]
    UnknownField(String),
    #[error("unknown category `{0}` (expected tshirts|jackets|hoodies|kids)")]
    InvalidCategory(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
