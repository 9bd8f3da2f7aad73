//! The Offer Entry Manager: owns the draft, the accepted list, and the side effects
//! the reducer asks for.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::config::AppConfig;
use crate::domain::offer::{AcceptedOffer, DraftOffer, ImageFile};
use crate::editor::{
    DraftAction, DraftEditor, DraftField, EditorEffect, EditorError, EditorPhase, EditorState,
    PreviewTicket, TransitionOutcome,
};
use crate::errors::DomainError;
use crate::offers::{Clock, OfferIdGenerator, OfferList, SystemClock};
use crate::preview::{CompletedImage, DataUrlDecoder, PendingImage, PreviewError};
use crate::pricing::OfferPricing;
use crate::submission::{SubmissionGate, VALIDATION_ALERT};

/// Resets whatever widget holds the picked file once the draft no longer refers to it.
pub trait FileSelection: Send + Sync {
    fn clear(&self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopFileSelection;

impl FileSelection for NoopFileSelection {
    fn clear(&self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ManagerSettings {
    pub pricing: OfferPricing,
    pub gate: SubmissionGate,
    pub max_image_bytes: Option<u64>,
}

impl ManagerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            pricing: OfferPricing::new(config.pricing.scale),
            gate: SubmissionGate::new(config.submission.require_discount),
            max_image_bytes: Some(config.preview.max_image_bytes),
        }
    }

    pub fn decoder(&self) -> DataUrlDecoder {
        self.max_image_bytes.map(DataUrlDecoder::new).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageCompletion {
    Applied(PreviewTicket),
    Stale { ticket: PreviewTicket, current: PreviewTicket },
    Failed(PreviewError),
}

pub struct OfferEntryManager {
    session_id: String,
    editor: DraftEditor,
    state: EditorState,
    offers: OfferList,
    ids: OfferIdGenerator,
    clock: Arc<dyn Clock>,
    file_selection: Arc<dyn FileSelection>,
    audit_sink: Arc<dyn AuditSink>,
    alert: Option<&'static str>,
    preview_error: Option<PreviewError>,
}

impl Default for OfferEntryManager {
    fn default() -> Self {
        Self::new(ManagerSettings::default())
    }
}

impl OfferEntryManager {
    pub fn new(settings: ManagerSettings) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            editor: DraftEditor::new(settings.pricing, settings.gate),
            state: EditorState::default(),
            offers: OfferList::default(),
            ids: OfferIdGenerator::default(),
            clock: Arc::new(SystemClock),
            file_selection: Arc::new(NoopFileSelection),
            audit_sink: Arc::new(NoopAuditSink),
            alert: None,
            preview_error: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_file_selection(mut self, file_selection: Arc<dyn FileSelection>) -> Self {
        self.file_selection = file_selection;
        self
    }

    pub fn with_audit_sink(mut self, audit_sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = audit_sink;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn draft(&self) -> &DraftOffer {
        &self.state.draft
    }

    pub fn phase(&self) -> EditorPhase {
        self.state.phase
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn offers(&self) -> &OfferList {
        &self.offers
    }

    /// The blocking alert raised by the last rejected submission, if not dismissed.
    pub fn alert(&self) -> Option<&'static str> {
        self.alert
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn preview_error(&self) -> Option<&PreviewError> {
        self.preview_error.as_ref()
    }

    pub fn update(
        &mut self,
        field: DraftField,
        value: impl Into<String>,
    ) -> Result<TransitionOutcome, EditorError> {
        self.dispatch(DraftAction::UpdateField { field, value: value.into() })
    }

    pub fn update_key(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<TransitionOutcome, EditorError> {
        let field = key.parse::<DraftField>()?;
        self.update(field, value)
    }

    /// Starts an image load. The caller decodes the returned job off the input path
    /// and hands the result to [`OfferEntryManager::complete_image`].
    pub fn begin_image_load(&mut self, file: ImageFile) -> PendingImage {
        let ticket = self.editor.begin_image(&mut self.state);
        self.preview_error = None;
        info!(
            event_name = "preview.image_selected",
            session_id = %self.session_id,
            ticket = ticket.0,
            file_name = %file.file_name,
            size = file.size,
            "image decode started"
        );
        PendingImage { ticket, file }
    }

    pub fn complete_image(
        &mut self,
        completed: CompletedImage,
    ) -> Result<ImageCompletion, EditorError> {
        let CompletedImage { ticket, file, result } = completed;
        let preview = match result {
            Ok(preview) => preview,
            Err(error) => {
                warn!(
                    event_name = "preview.image_failed",
                    session_id = %self.session_id,
                    ticket = ticket.0,
                    error = %error,
                    "image decode failed"
                );
                let audit = self.audit_context();
                self.audit_sink.emit(
                    AuditEvent::new(
                        &audit,
                        "preview.image_failed",
                        AuditCategory::Preview,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                if self.state.pending_image == Some(ticket) {
                    self.preview_error = Some(error.clone());
                }
                return Ok(ImageCompletion::Failed(error));
            }
        };

        let outcome = self.dispatch(DraftAction::ImageLoaded { ticket, image: file, preview })?;
        let completion = outcome
            .effects
            .iter()
            .find_map(|effect| match effect {
                EditorEffect::StaleImageDiscarded { ticket, current } => {
                    Some(ImageCompletion::Stale { ticket: *ticket, current: *current })
                }
                _ => None,
            })
            .unwrap_or(ImageCompletion::Applied(ticket));
        Ok(completion)
    }

    /// Rejected submissions do not use up an id.
    pub fn submit(&mut self) -> Result<AcceptedOffer, DomainError> {
        let created_at = self.clock.now();
        let id = self.ids.propose(created_at);
        let outcome = self.dispatch(DraftAction::Submit { id, created_at })?;
        let offer = outcome.accepted_offer().cloned().ok_or_else(|| {
            DomainError::InvariantViolation("submit succeeded without an accepted offer".into())
        })?;
        self.ids.commit(offer.id);
        Ok(offer)
    }

    pub fn reset(&mut self) -> Result<TransitionOutcome, EditorError> {
        self.dispatch(DraftAction::Reset)
    }

    pub fn dispatch(&mut self, action: DraftAction) -> Result<TransitionOutcome, EditorError> {
        let audit = self.audit_context();
        let kind = action.kind();
        let result =
            self.editor.apply_with_audit(&mut self.state, action, self.audit_sink.as_ref(), &audit);

        match &result {
            Ok(outcome) => {
                debug!(
                    event_name = "editor.transition_applied",
                    session_id = %self.session_id,
                    correlation_id = %audit.correlation_id,
                    action = ?kind,
                    from = ?outcome.from,
                    to = ?outcome.to,
                    "draft transition applied"
                );
                self.run_effects(outcome);
            }
            Err(EditorError::Validation(error)) => {
                self.alert = Some(VALIDATION_ALERT);
                warn!(
                    event_name = "submission.rejected",
                    session_id = %self.session_id,
                    correlation_id = %audit.correlation_id,
                    missing_fields = ?error.missing_fields,
                    "submission blocked by validation"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "editor.update_rejected",
                    session_id = %self.session_id,
                    correlation_id = %audit.correlation_id,
                    error = %error,
                    "draft update rejected"
                );
            }
        }
        result
    }

    fn run_effects(&mut self, outcome: &TransitionOutcome) {
        for effect in &outcome.effects {
            match effect {
                EditorEffect::AcceptOffer(offer) => {
                    info!(
                        event_name = "submission.accepted",
                        session_id = %self.session_id,
                        offer_id = offer.id.0,
                        category = offer.category.as_str(),
                        offer_price = %offer.offer_price,
                        "offer accepted"
                    );
                    self.offers.prepend(offer.as_ref().clone());
                    self.alert = None;
                    self.preview_error = None;
                }
                EditorEffect::ClearFileSelection => {
                    self.file_selection.clear();
                    self.preview_error = None;
                }
                EditorEffect::StaleImageDiscarded { ticket, current } => {
                    debug!(
                        event_name = "preview.image_discarded",
                        session_id = %self.session_id,
                        ticket = ticket.0,
                        current = current.0,
                        "stale image decode discarded"
                    );
                }
                EditorEffect::OfferPriceRecomputed { .. }
                | EditorEffect::OfferPriceKept
                | EditorEffect::ImageApplied { .. } => {}
            }
        }
    }

    fn audit_context(&self) -> AuditContext {
        AuditContext::new(self.session_id.clone(), Uuid::new_v4().to_string(), "offer-admin")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use super::{FileSelection, ImageCompletion, ManagerSettings, OfferEntryManager};
    use crate::audit::InMemoryAuditSink;
    use crate::domain::offer::{ImageFile, OfferId};
    use crate::editor::{DraftField, EditorPhase};
    use crate::errors::DomainError;
    use crate::offers::Clock;
    use crate::preview::{DataUrlDecoder, PendingImage};
    use crate::submission::{SubmissionGate, VALIDATION_ALERT};

    #[derive(Default)]
    struct CountingPicker {
        clears: AtomicUsize,
    }

    impl FileSelection for CountingPicker {
        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FrozenClock(DateTime<Utc>);

    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn frozen_clock() -> Arc<FrozenClock> {
        let at = Utc.timestamp_millis_opt(1_730_000_000_000).single().expect("valid instant");
        Arc::new(FrozenClock(at))
    }

    fn png(name: &str) -> ImageFile {
        ImageFile::new(name, b"\x89PNG\r\n\x1a\n\x00\x01".to_vec())
    }

    async fn load_image(manager: &mut OfferEntryManager, file: ImageFile) -> ImageCompletion {
        let pending = manager.begin_image_load(file);
        let completed = pending.decode(&DataUrlDecoder::default()).await;
        manager.complete_image(completed).expect("image completion")
    }

    async fn fill(manager: &mut OfferEntryManager, name: &str, product_id: &str) {
        manager.update(DraftField::Name, name).expect("name");
        manager.update(DraftField::ProductId, product_id).expect("product id");
        manager.update(DraftField::Category, "tshirts").expect("category");
        manager.update(DraftField::OriginalPrice, "1000").expect("price");
        manager.update(DraftField::DiscountPercent, "20").expect("discount");
        let completion = load_image(manager, png("tee.png")).await;
        assert!(matches!(completion, ImageCompletion::Applied(_)));
    }

    #[tokio::test]
    async fn submit_prepends_resets_and_clears_picker() {
        let picker = Arc::new(CountingPicker::default());
        let mut manager = OfferEntryManager::default().with_file_selection(picker.clone());

        fill(&mut manager, "Graphic Tee", "TS-1").await;
        let offer = manager.submit().expect("complete draft accepted");

        assert_eq!(offer.offer_price.to_string(), "800.00");
        assert_eq!(manager.offers().len(), 1);
        assert!(manager.draft().is_blank());
        assert_eq!(manager.phase(), EditorPhase::Idle);
        assert_eq!(picker.clears.load(Ordering::SeqCst), 1);
        assert_eq!(manager.alert(), None);
    }

    #[tokio::test]
    async fn later_submissions_come_first() {
        let mut manager = OfferEntryManager::default();
        fill(&mut manager, "A", "P-A").await;
        manager.submit().expect("A accepted");
        fill(&mut manager, "B", "P-B").await;
        manager.submit().expect("B accepted");

        let names: Vec<&str> = manager.offers().iter().map(|offer| offer.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn same_millisecond_submissions_get_distinct_ids() {
        let mut manager = OfferEntryManager::default().with_clock(frozen_clock());
        fill(&mut manager, "A", "P-A").await;
        let first = manager.submit().expect("A accepted");
        fill(&mut manager, "B", "P-B").await;
        let second = manager.submit().expect("B accepted");

        assert_eq!(first.id, OfferId(1_730_000_000_000));
        assert_eq!(second.id, OfferId(1_730_000_000_001));
    }

    #[tokio::test]
    async fn rejected_submission_does_not_use_up_an_id() {
        let mut manager = OfferEntryManager::default().with_clock(frozen_clock());
        fill(&mut manager, "A", "P-A").await;
        manager.update(DraftField::Name, "").expect("clear name");
        manager.submit().expect_err("name missing");

        manager.update(DraftField::Name, "A").expect("name");
        let offer = manager.submit().expect("A accepted");
        assert_eq!(offer.id, OfferId(1_730_000_000_000));
    }

    #[tokio::test]
    async fn discount_above_one_hundred_percent_still_submits() {
        let mut manager = OfferEntryManager::default();
        fill(&mut manager, "Clearance Tee", "TS-150").await;
        manager.update(DraftField::OriginalPrice, "100").expect("price");
        manager.update(DraftField::DiscountPercent, "150").expect("discount");
        assert_eq!(manager.draft().offer_price, "-50.00");

        let offer = manager.submit().expect("negative derived price is present");
        assert_eq!(offer.offer_price.to_string(), "-50.00");
        assert_eq!(manager.alert(), None);
        assert_eq!(manager.offers().len(), 1);
    }

    #[test]
    fn missing_image_blocks_submission_with_alert() {
        let sink = InMemoryAuditSink::default();
        let mut manager = OfferEntryManager::default().with_audit_sink(Arc::new(sink.clone()));
        manager.update(DraftField::Name, "No Picture").expect("name");
        manager.update(DraftField::ProductId, "NP-1").expect("product id");
        manager.update(DraftField::Category, "kids").expect("category");
        manager.update(DraftField::OriginalPrice, "10").expect("price");

        let error = manager.submit().expect_err("image missing");
        assert!(matches!(error, DomainError::Editor(_)));
        assert_eq!(manager.alert(), Some(VALIDATION_ALERT));
        assert!(manager.offers().is_empty());
        assert_eq!(manager.draft().name, "No Picture");
        assert!(sink.event_types().contains(&"submission.rejected".to_string()));

        manager.dismiss_alert();
        assert_eq!(manager.alert(), None);
    }

    #[tokio::test]
    async fn edits_made_during_decode_survive_completion() {
        let mut manager = OfferEntryManager::default();
        manager.update(DraftField::Name, "before").expect("name");

        let pending = manager.begin_image_load(png("slow.png"));
        manager.update(DraftField::Name, "typed while decoding").expect("name");
        manager.update(DraftField::OriginalPrice, "250").expect("price");

        let completed = pending.decode(&DataUrlDecoder::default()).await;
        assert!(matches!(manager.complete_image(completed), Ok(ImageCompletion::Applied(_))));

        assert_eq!(manager.draft().name, "typed while decoding");
        assert_eq!(manager.draft().offer_price, "250.00");
        assert!(manager.draft().image_preview.is_some());
    }

    #[tokio::test]
    async fn superseded_decode_is_reported_stale() {
        let mut manager = OfferEntryManager::default();
        let first: PendingImage = manager.begin_image_load(png("first.png"));
        let second = manager.begin_image_load(png("second.png"));

        let late = first.decode(&DataUrlDecoder::default()).await;
        assert!(matches!(manager.complete_image(late), Ok(ImageCompletion::Stale { .. })));

        let current = second.decode(&DataUrlDecoder::default()).await;
        assert!(matches!(manager.complete_image(current), Ok(ImageCompletion::Applied(_))));
        assert_eq!(
            manager.draft().image.as_ref().map(|image| image.file_name.as_str()),
            Some("second.png")
        );
    }

    #[tokio::test]
    async fn failed_decode_keeps_gate_closed() {
        let mut manager = OfferEntryManager::default();
        let completion = load_image(&mut manager, ImageFile::new("empty.png", Vec::new())).await;

        assert!(matches!(completion, ImageCompletion::Failed(_)));
        assert!(manager.preview_error().is_some());
        assert!(manager.draft().image_preview.is_none());
    }

    #[test]
    fn unknown_field_key_is_rejected() {
        let mut manager = OfferEntryManager::default();
        assert!(manager.update_key("colour", "red").is_err());
        manager.update_key("productId", "SKU-9").expect("camel case key");
        manager.update_key("original_price", "12").expect("snake case key");
        assert_eq!(manager.draft().product_id, "SKU-9");
        assert_eq!(manager.draft().offer_price, "12.00");
    }

    #[tokio::test]
    async fn discount_can_be_made_mandatory() {
        let settings =
            ManagerSettings { gate: SubmissionGate::new(true), ..ManagerSettings::default() };
        let mut manager = OfferEntryManager::new(settings);
        fill(&mut manager, "Parka", "JK-7").await;
        manager.update(DraftField::DiscountPercent, "").expect("clear discount");

        assert!(manager.submit().is_err());
        manager.update(DraftField::DiscountPercent, "5").expect("discount");
        assert!(manager.submit().is_ok());
    }

    #[test]
    fn reset_clears_draft_and_picker() {
        let picker = Arc::new(CountingPicker::default());
        let mut manager = OfferEntryManager::default().with_file_selection(picker.clone());
        manager.update(DraftField::Name, "scratch").expect("name");

        let outcome = manager.reset().expect("reset");
        assert_eq!(outcome.to, EditorPhase::Idle);
        assert!(manager.draft().is_blank());
        assert_eq!(picker.clears.load(Ordering::SeqCst), 1);
    }
}
