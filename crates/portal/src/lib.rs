//! HTML rendering for the offer admin screen.
//!
//! The accepted list is rendered twice, as a table for wide viewports and as
//! stacked cards for narrow ones. Both are always present in the output; CSS picks
//! which one is visible.

pub mod filters;
pub mod views;

use std::path::Path;

use offerdesk_core::config::RenderConfig;
use offerdesk_core::domain::offer::AcceptedOffer;
use offerdesk_core::errors::ApplicationError;
use offerdesk_core::manager::OfferEntryManager;
use offerdesk_core::pricing::DEFAULT_PRICE_SCALE;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{info, warn};

pub use views::{offer_rows, OfferRow, PageView, EMPTY_STATE_MESSAGE};

pub const TABLE_TEMPLATE: &str = "offers/table.html.tera";
pub const CARDS_TEMPLATE: &str = "offers/cards.html.tera";
pub const PAGE_TEMPLATE: &str = "offers/page.html.tera";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
}

impl From<tera::Error> for RenderError {
    fn from(error: tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Template(message)
    }
}

impl From<RenderError> for ApplicationError {
    fn from(error: RenderError) -> Self {
        ApplicationError::Rendering(error.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct OfferRenderer {
    tera: Tera,
    price_scale: u32,
}

impl OfferRenderer {
    pub fn with_embedded_templates() -> Result<Self, RenderError> {
        let mut tera = embedded_templates()?;
        finish(&mut tera);
        Ok(Self { tera, price_scale: DEFAULT_PRICE_SCALE })
    }

    /// Loads `*.tera` files under `template_dir`; templates it does not provide fall
    /// back to the embedded ones.
    pub fn from_dir(template_dir: &Path) -> Result<Self, RenderError> {
        let pattern = format!("{}/**/*.tera", template_dir.display());
        let mut tera = Tera::new(&pattern)?;
        tera.extend(&embedded_templates()?)?;
        finish(&mut tera);
        Ok(Self { tera, price_scale: DEFAULT_PRICE_SCALE })
    }

    pub fn from_config(config: &RenderConfig) -> Result<Self, RenderError> {
        let Some(template_dir) = config.template_dir.as_deref() else {
            return Self::with_embedded_templates();
        };

        match Self::from_dir(template_dir) {
            Ok(renderer) => {
                info!(
                    event_name = "render.templates_loaded",
                    template_dir = %template_dir.display(),
                    "offer templates loaded from filesystem"
                );
                Ok(renderer)
            }
            Err(error) => {
                warn!(
                    event_name = "render.templates_fallback",
                    template_dir = %template_dir.display(),
                    error = %error,
                    "failed to load offer templates from filesystem, using embedded templates"
                );
                Self::with_embedded_templates()
            }
        }
    }

    /// Decimal places for prices in the list; match `pricing.scale`.
    pub fn with_price_scale(mut self, scale: u32) -> Self {
        self.price_scale = scale;
        self
    }

    pub fn render_table(&self, offers: &[AcceptedOffer]) -> Result<String, RenderError> {
        self.render_list_template(TABLE_TEMPLATE, offers)
    }

    pub fn render_cards(&self, offers: &[AcceptedOffer]) -> Result<String, RenderError> {
        self.render_list_template(CARDS_TEMPLATE, offers)
    }

    /// Table followed by cards, as they appear on the page.
    pub fn render_list(&self, offers: &[AcceptedOffer]) -> Result<String, RenderError> {
        let mut html = self.render_table(offers)?;
        html.push('\n');
        html.push_str(&self.render_cards(offers)?);
        Ok(html)
    }

    pub fn render_page(&self, manager: &OfferEntryManager) -> Result<String, RenderError> {
        self.render_page_view(&PageView::from_manager(manager))
    }

    pub fn render_page_view(&self, page: &PageView) -> Result<String, RenderError> {
        let mut context = Context::from_serialize(page)?;
        self.insert_shared(&mut context);
        Ok(self.tera.render(PAGE_TEMPLATE, &context)?)
    }

    fn render_list_template(
        &self,
        template: &str,
        offers: &[AcceptedOffer],
    ) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("offers", &offer_rows(offers));
        self.insert_shared(&mut context);
        Ok(self.tera.render(template, &context)?)
    }

    fn insert_shared(&self, context: &mut Context) {
        context.insert("empty_message", EMPTY_STATE_MESSAGE);
        context.insert("price_scale", &self.price_scale);
    }
}

fn embedded_templates() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (TABLE_TEMPLATE, include_str!("../../../templates/offers/table.html.tera")),
        (CARDS_TEMPLATE, include_str!("../../../templates/offers/cards.html.tera")),
        (PAGE_TEMPLATE, include_str!("../../../templates/offers/page.html.tera")),
    ])?;
    Ok(tera)
}

fn finish(tera: &mut Tera) {
    tera.autoescape_on(vec![".html.tera", ".html"]);
    filters::register_template_filters(tera);
}
