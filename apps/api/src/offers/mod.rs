//! Offer letters: Handlebars HTML printed to PDF by headless Chromium.

pub mod handlers;
pub mod pdf;
pub mod template;

use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use pdf::PdfPrinter;
use template::{OfferLetter, OfferTemplate};

#[derive(Clone)]
pub struct OfferRenderer {
    template: Arc<OfferTemplate>,
    printer: PdfPrinter,
}

impl OfferRenderer {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            template: Arc::new(OfferTemplate::load(config.offer_template_path.as_deref())?),
            printer: PdfPrinter::new(config.chrome_bin.clone()),
        })
    }

    pub async fn render_pdf(&self, letter: &OfferLetter) -> Result<Vec<u8>, AppError> {
        let html = self.template.render(letter)?;
        self.printer.print(&html).await
    }
}
