use serde::Serialize;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::offer::{Category, DraftOffer};
use crate::editor::actions::{
    DraftAction, DraftField, EditorEffect, EditorPhase, PreviewTicket, TransitionOutcome,
};
use crate::editor::EditorError;
use crate::pricing::OfferPricing;
use crate::submission::SubmissionGate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditorState {
    pub draft: DraftOffer,
    pub phase: EditorPhase,
    /// Latest ticket handed out; retired tickets are strictly lower.
    pub image_generation: u64,
    pub pending_image: Option<PreviewTicket>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            draft: DraftOffer::default(),
            phase: EditorPhase::Idle,
            image_generation: 0,
            pending_image: None,
        }
    }
}

impl EditorState {
    pub fn is_loading_image(&self) -> bool {
        self.pending_image.is_some()
    }

    fn clear(&mut self) {
        self.draft = DraftOffer::default();
        self.phase = EditorPhase::Idle;
        self.image_generation += 1;
        self.pending_image = None;
    }
}

/// Reducer over [`EditorState`]. Every mutation of the draft goes through
/// [`DraftEditor::apply`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DraftEditor {
    pricing: OfferPricing,
    gate: SubmissionGate,
}

impl DraftEditor {
    pub fn new(pricing: OfferPricing, gate: SubmissionGate) -> Self {
        Self { pricing, gate }
    }

    pub fn pricing(&self) -> &OfferPricing {
        &self.pricing
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    /// Registers a new image selection and returns the ticket its decode must present.
    pub fn begin_image(&self, state: &mut EditorState) -> PreviewTicket {
        state.image_generation += 1;
        let ticket = PreviewTicket(state.image_generation);
        state.pending_image = Some(ticket);
        state.phase = EditorPhase::Editing;
        ticket
    }

    pub fn apply(
        &self,
        state: &mut EditorState,
        action: DraftAction,
    ) -> Result<TransitionOutcome, EditorError> {
        let from = state.phase;
        let kind = action.kind();
        let mut effects = Vec::new();

        match action {
            DraftAction::UpdateField { field, value } => {
                self.update_field(&mut state.draft, field, value, &mut effects)?;
                state.phase = EditorPhase::Editing;
            }
            DraftAction::ImageLoaded { ticket, image, preview } => {
                if state.pending_image == Some(ticket) {
                    state.draft.image = Some(image);
                    state.draft.image_preview = Some(preview);
                    state.pending_image = None;
                    state.phase = EditorPhase::Editing;
                    effects.push(EditorEffect::ImageApplied { ticket });
                } else {
                    effects.push(EditorEffect::StaleImageDiscarded {
                        ticket,
                        current: PreviewTicket(state.image_generation),
                    });
                }
            }
            DraftAction::Submit { id, created_at } => {
                let offer = self.gate.submit(&state.draft, id, created_at)?;
                state.clear();
                effects.push(EditorEffect::AcceptOffer(Box::new(offer)));
                effects.push(EditorEffect::ClearFileSelection);
            }
            DraftAction::Reset => {
                state.clear();
                effects.push(EditorEffect::ClearFileSelection);
            }
        }

        Ok(TransitionOutcome { from, to: state.phase, action: kind, effects })
    }

    pub fn apply_with_audit<S>(
        &self,
        state: &mut EditorState,
        action: DraftAction,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, EditorError>
    where
        S: AuditSink + ?Sized,
    {
        let field = match &action {
            DraftAction::UpdateField { field, .. } => Some(*field),
            _ => None,
        };
        let result = self.apply(state, action);
        match &result {
            Ok(outcome) => {
                for event in audit_events_for(outcome, field, audit) {
                    sink.emit(event);
                }
            }
            Err(EditorError::Validation(error)) => {
                let missing: Vec<&str> =
                    error.missing_fields.iter().map(|field| field.as_str()).collect();
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "submission.rejected",
                        AuditCategory::Submission,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("missing_fields", missing.join(",")),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "editor.update_rejected",
                        AuditCategory::Editor,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn update_field(
        &self,
        draft: &mut DraftOffer,
        field: DraftField,
        value: String,
        effects: &mut Vec<EditorEffect>,
    ) -> Result<(), EditorError> {
        if field.drives_offer_price() {
            let (original, discount) = match field {
                DraftField::OriginalPrice => (value.as_str(), draft.discount_percent.as_str()),
                _ => (draft.original_price.as_str(), value.as_str()),
            };
            match self.pricing.recompute(original, discount) {
                Some(offer_price) => {
                    draft.offer_price = offer_price.clone();
                    effects.push(EditorEffect::OfferPriceRecomputed { offer_price });
                }
                None => effects.push(EditorEffect::OfferPriceKept),
            }
        }

        match field {
            DraftField::Name => draft.name = value,
            DraftField::ProductId => draft.product_id = value,
            DraftField::Category => draft.category = parse_category(&value)?,
            DraftField::OriginalPrice => draft.original_price = value,
            DraftField::DiscountPercent => draft.discount_percent = value,
            DraftField::OfferPrice => draft.offer_price = value,
        }
        Ok(())
    }
}

fn parse_category(value: &str) -> Result<Option<Category>, EditorError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    value
        .parse::<Category>()
        .map(Some)
        .map_err(|unknown| EditorError::InvalidCategory(unknown.0))
}

fn audit_events_for(
    outcome: &TransitionOutcome,
    field: Option<DraftField>,
    audit: &AuditContext,
) -> Vec<AuditEvent> {
    let mut events = Vec::new();
    if let Some(field) = field {
        events.push(
            AuditEvent::new(audit, "editor.field_updated", AuditCategory::Editor, AuditOutcome::Success)
                .with_metadata("field", field.key()),
        );
    }

    for effect in &outcome.effects {
        let event = match effect {
            EditorEffect::OfferPriceRecomputed { offer_price } => AuditEvent::new(
                audit,
                "editor.offer_price_recomputed",
                AuditCategory::Editor,
                AuditOutcome::Success,
            )
            .with_metadata("offer_price", offer_price.clone()),
            EditorEffect::OfferPriceKept => AuditEvent::new(
                audit,
                "editor.offer_price_kept",
                AuditCategory::Editor,
                AuditOutcome::Failed,
            ),
            EditorEffect::ImageApplied { ticket } => AuditEvent::new(
                audit,
                "preview.image_loaded",
                AuditCategory::Preview,
                AuditOutcome::Success,
            )
            .with_metadata("ticket", ticket.0.to_string()),
            EditorEffect::StaleImageDiscarded { ticket, current } => AuditEvent::new(
                audit,
                "preview.image_discarded",
                AuditCategory::Preview,
                AuditOutcome::Rejected,
            )
            .with_metadata("ticket", ticket.0.to_string())
            .with_metadata("current", current.0.to_string()),
            EditorEffect::AcceptOffer(offer) => AuditEvent::new(
                audit,
                "submission.accepted",
                AuditCategory::Submission,
                AuditOutcome::Success,
            )
            .with_offer(offer.id)
            .with_metadata("category", offer.category.as_str())
            .with_metadata("offer_price", offer.offer_price.to_string()),
            EditorEffect::ClearFileSelection => continue,
        };
        events.push(event);
    }

    if outcome.action == crate::editor::actions::ActionKind::Reset {
        events.push(AuditEvent::new(
            audit,
            "editor.reset",
            AuditCategory::Editor,
            AuditOutcome::Success,
        ));
    }
    events
}
