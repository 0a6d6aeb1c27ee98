use std::path::Path;

use anyhow::Context;

use crate::chart::{self, ChartKind, ChartLabels, Figure};
use crate::data::loader::load_file;
use crate::data::model::CanonicalData;
use crate::data::normalize::{detect_source_kind, normalize};
use crate::error::{ChartError, Result};
use crate::summary::{ChatCompletionClient, Summarizer, SummaryConfig};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The full session, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Current dataset (None until text is applied or a file is imported).
    /// Replaced wholesale, never edited in place.
    pub dataset: Option<CanonicalData>,

    /// Text typed into the input box.
    pub input_text: String,

    pub chart_kind: ChartKind,
    pub labels: ChartLabels,

    /// Last successfully rendered figure.
    pub figure: Option<Figure>,

    /// Last AI summary.
    pub summary: Option<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Install a new dataset; the previous figure and summary belong to the
    /// old data and are dropped.
    pub fn set_dataset(&mut self, dataset: CanonicalData) {
        log::info!("dataset loaded: {}", dataset.describe());
        self.status_message = Some(format!("Loaded {}", dataset.describe()));
        self.dataset = Some(dataset);
        self.figure = None;
        self.summary = None;
    }

    /// Normalize `input_text` (shorthand or JSON, detected) into the dataset.
    /// On failure the current dataset is kept.
    pub fn ingest_text(&mut self) -> Result<()> {
        let kind = detect_source_kind(&self.input_text);
        let dataset = normalize(&self.input_text, kind)?;
        self.set_dataset(dataset);
        Ok(())
    }

    pub fn import_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let dataset = load_file(path)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        self.input_text = dataset.to_pretty_json();
        self.set_dataset(dataset);
        Ok(())
    }

    /// Dispatch the dataset to a figure. The old figure is cleared first so a
    /// failure leaves the preview blank.
    pub fn render(&mut self) -> Result<()> {
        self.figure = None;
        let figure = chart::render(self.dataset.as_ref(), self.chart_kind, &self.labels)?;
        if figure.is_empty() {
            self.status_message = Some(format!(
                "Nothing to draw: {} is not available for this data",
                self.chart_kind
            ));
        } else {
            self.status_message = Some(format!("Rendered {} chart", self.chart_kind));
        }
        self.figure = Some(figure);
        Ok(())
    }

    pub fn export(&mut self, path: &Path) -> Result<()> {
        let figure = self
            .figure
            .as_ref()
            .ok_or_else(|| ChartError::render("nothing to save"))?;
        chart::export(figure, path)?;
        self.status_message = Some(format!("Saved {}", path.display()));
        Ok(())
    }

    pub fn summarize(&mut self, summarizer: &dyn Summarizer) -> Result<()> {
        let dataset = self.dataset.as_ref().ok_or_else(|| ChartError::render("no data"))?;
        let summary = summarizer.summarize(&dataset.to_pretty_json())?;
        self.summary = Some(summary);
        self.status_message = Some("Summary ready".to_string());
        Ok(())
    }

    /// Summarize through the endpoint configured in `config_path`. The
    /// dataset is checked before the configuration is read.
    pub fn request_summary(&mut self, config_path: &Path) -> Result<()> {
        if self.dataset.is_none() {
            return Err(ChartError::render("no data"));
        }
        let client = ChatCompletionClient::new(SummaryConfig::load(config_path)?);
        self.summarize(&client)
    }

    /// Pretty JSON of the dataset for the preview pane.
    pub fn preview(&self) -> Option<String> {
        self.dataset.as_ref().map(CanonicalData::to_pretty_json)
    }
}
