use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use offerdesk_core::config::{AppConfig, LoadOptions};
use offerdesk_core::domain::offer::{DraftOffer, ImageFile};
use offerdesk_core::errors::{ApplicationError, DomainError};
use offerdesk_core::manager::{FileSelection, ImageCompletion, ManagerSettings, OfferEntryManager};
use offerdesk_core::preview::{CompletedImage, DataUrlDecoder, PendingImage, PreviewError};
use offerdesk_portal::OfferRenderer;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::commands::CommandResult;

/// A scripted editing session.
///
/// ```json
/// { "steps": [
///     { "op": "update", "field": "name", "value": "Logo Tee" },
///     { "op": "image", "path": "tee.png" },
///     { "op": "settle" },
///     { "op": "submit" }
/// ] }
/// ```
///
/// Image paths are resolved against the script's directory. Decodes run in the
/// background until the next `settle` step; whatever is still running when the
/// script ends is settled before the summary is built.
#[derive(Debug, Deserialize)]
pub struct ReplayScript {
    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    Update { field: String, value: String },
    Image { path: PathBuf },
    Settle,
    Submit,
    Reset,
}

#[derive(Debug, Serialize)]
struct ReplaySummary {
    session_id: String,
    steps: usize,
    accepted: Vec<AcceptedSummary>,
    rejected_submissions: usize,
    alerts: Vec<String>,
    rejected_updates: Vec<String>,
    images: Vec<ImageEvent>,
    draft: DraftSummary,
    selected_file: Option<String>,
    html: Option<String>,
}

#[derive(Debug, Serialize)]
struct AcceptedSummary {
    id: i64,
    name: String,
    product_id: String,
    category: &'static str,
    offer_price: String,
}

#[derive(Debug, Serialize)]
struct ImageEvent {
    ticket: u64,
    file_name: String,
    outcome: &'static str,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DraftSummary {
    name: String,
    product_id: String,
    category: Option<&'static str>,
    original_price: String,
    discount_percent: String,
    offer_price: String,
    image_file: Option<String>,
    has_preview: bool,
}

impl From<&DraftOffer> for DraftSummary {
    fn from(draft: &DraftOffer) -> Self {
        Self {
            name: draft.name.clone(),
            product_id: draft.product_id.clone(),
            category: draft.category.map(|category| category.as_str()),
            original_price: draft.original_price.clone(),
            discount_percent: draft.discount_percent.clone(),
            offer_price: draft.offer_price.clone(),
            image_file: draft.image.as_ref().map(|image| image.file_name.clone()),
            has_preview: draft.image_preview.is_some(),
        }
    }
}

/// Stands in for the form's file input.
#[derive(Clone, Debug, Default)]
pub struct PickerState {
    selected: Arc<Mutex<Option<PathBuf>>>,
}

impl PickerState {
    pub fn select(&self, path: PathBuf) {
        if let Ok(mut selected) = self.selected.lock() {
            *selected = Some(path);
        }
    }

    pub fn selected(&self) -> Option<PathBuf> {
        self.selected.lock().ok().and_then(|selected| selected.clone())
    }
}

impl FileSelection for PickerState {
    fn clear(&self) {
        if let Ok(mut selected) = self.selected.lock() {
            *selected = None;
        }
    }
}

type ReplayFailure = (&'static str, ApplicationError, u8);

pub fn run(options: &LoadOptions, script_path: &Path, html_path: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::from_error(
                "replay",
                "config_validation",
                ApplicationError::Configuration(error.to_string()),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "replay",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                6,
            );
        }
    };

    match runtime.block_on(replay(&config, script_path, html_path)) {
        Ok(summary) => {
            let message = format!(
                "replayed {} steps: {} accepted, {} rejected",
                summary.steps,
                summary.accepted.len(),
                summary.rejected_submissions
            );
            CommandResult::success_with_details("replay", message, summary)
        }
        Err((error_class, error, exit_code)) => {
            CommandResult::from_error("replay", error_class, error, exit_code)
        }
    }
}

async fn replay(
    config: &AppConfig,
    script_path: &Path,
    html_path: Option<&Path>,
) -> Result<ReplaySummary, ReplayFailure> {
    let script = load_script(script_path)
        .await
        .map_err(|error| ("script_invalid", ApplicationError::Input(format!("{error:#}")), 3u8))?;
    let base_dir = script_path.parent().map(Path::to_path_buf).unwrap_or_default();

    let settings = ManagerSettings::from_config(config);
    let decoder = settings.decoder();
    let picker = PickerState::default();
    let mut manager =
        OfferEntryManager::new(settings).with_file_selection(Arc::new(picker.clone()));

    let mut in_flight: Vec<JoinHandle<CompletedImage>> = Vec::new();
    let mut images = Vec::new();
    let mut alerts = Vec::new();
    let mut rejected_updates = Vec::new();
    let mut rejected_submissions = 0usize;

    for (index, step) in script.steps.iter().enumerate() {
        match step {
            ReplayStep::Update { field, value } => {
                if let Err(error) = manager.update_key(field, value.as_str()) {
                    rejected_updates.push(format!("step {index}: {error}"));
                }
            }
            ReplayStep::Image { path } => {
                let resolved = if path.is_absolute() { path.clone() } else { base_dir.join(path) };
                let file = read_image(&resolved)
                    .await
                    .map_err(|error| ("image_read", ApplicationError::from(error), 4u8))?;
                picker.select(resolved);
                let pending = manager.begin_image_load(file);
                in_flight.push(spawn_decode(decoder, pending));
            }
            ReplayStep::Settle => {
                settle(&mut manager, &mut in_flight, &mut images).await?;
            }
            ReplayStep::Submit => match manager.submit() {
                Ok(offer) => {
                    info!(
                        event_name = "replay.offer_accepted",
                        session_id = %manager.session_id(),
                        step = index,
                        offer_id = offer.id.0,
                        "replayed submission accepted"
                    );
                }
                Err(error @ DomainError::Editor(_)) => {
                    rejected_submissions += 1;
                    let interface =
                        ApplicationError::from(error).into_interface(manager.session_id());
                    alerts.push(interface.user_message().to_string());
                }
                Err(error @ DomainError::InvariantViolation(_)) => {
                    return Err(("invariant_violation", ApplicationError::from(error), 5u8));
                }
            },
            ReplayStep::Reset => {
                manager.reset().map_err(|error| ("editor", ApplicationError::from(error), 5u8))?;
            }
        }
    }

    settle(&mut manager, &mut in_flight, &mut images).await?;

    let html = match html_path {
        Some(path) => {
            write_page(config, &manager, path).await.map_err(|error| ("render", error, 5u8))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let pricing = settings.pricing;
    Ok(ReplaySummary {
        session_id: manager.session_id().to_string(),
        steps: script.steps.len(),
        accepted: manager
            .offers()
            .iter()
            .map(|offer| AcceptedSummary {
                id: offer.id.0,
                name: offer.name.clone(),
                product_id: offer.product_id.clone(),
                category: offer.category.as_str(),
                offer_price: pricing.format(offer.offer_price),
            })
            .collect(),
        rejected_submissions,
        alerts,
        rejected_updates,
        images,
        draft: DraftSummary::from(manager.draft()),
        selected_file: picker.selected().map(|path| path.display().to_string()),
        html,
    })
}

pub async fn load_script(path: &Path) -> anyhow::Result<ReplayScript> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read replay script `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse replay script `{}`", path.display()))
}

async fn read_image(path: &Path) -> Result<ImageFile, PreviewError> {
    let bytes = tokio::fs::read(path).await.map_err(|error| PreviewError::Read {
        path: path.display().to_string(),
        message: error.to_string(),
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ImageFile::new(file_name, bytes))
}

fn spawn_decode(
    decoder: DataUrlDecoder,
    pending: PendingImage,
) -> JoinHandle<CompletedImage> {
    tokio::spawn(async move { pending.decode(&decoder).await })
}

/// Completes decodes in the order they were started.
async fn settle(
    manager: &mut OfferEntryManager,
    in_flight: &mut Vec<JoinHandle<CompletedImage>>,
    images: &mut Vec<ImageEvent>,
) -> Result<(), ReplayFailure> {
    for handle in in_flight.drain(..) {
        let completed = handle.await.map_err(|error| {
            let error = DomainError::InvariantViolation(format!("image decode task failed: {error}"));
            ("decode_task", ApplicationError::from(error), 6u8)
        })?;
        let ticket = completed.ticket.0;
        let file_name = completed.file.file_name.clone();

        let completion = manager
            .complete_image(completed)
            .map_err(|error| ("editor", ApplicationError::from(error), 5u8))?;
        let event = match completion {
            ImageCompletion::Applied(_) => {
                ImageEvent { ticket, file_name, outcome: "applied", error: None }
            }
            ImageCompletion::Stale { .. } => {
                ImageEvent { ticket, file_name, outcome: "stale", error: None }
            }
            ImageCompletion::Failed(error) => {
                warn!(
                    event_name = "replay.image_failed",
                    session_id = %manager.session_id(),
                    ticket,
                    error = %error,
                    "replayed image could not be decoded"
                );
                ImageEvent { ticket, file_name, outcome: "failed", error: Some(error.to_string()) }
            }
        };
        images.push(event);
    }
    Ok(())
}

async fn write_page(
    config: &AppConfig,
    manager: &OfferEntryManager,
    path: &Path,
) -> Result<(), ApplicationError> {
    let renderer =
        OfferRenderer::from_config(&config.render)?.with_price_scale(config.pricing.scale);
    let page = renderer.render_page(manager)?;
    tokio::fs::write(path, page).await.map_err(|error| {
        ApplicationError::Rendering(format!("could not write page to `{}`: {error}", path.display()))
    })
}
