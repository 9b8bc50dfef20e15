//! Pipeline – ties together XML conversion, template rendering and PDF
//! export into a single call.
//!
//! Stages run in order and the first failure is returned unchanged. Files
//! written by earlier stages (the temp HTML) are left in place.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::export::{render_to_pdf, ExportConfig};
use crate::funcs::FuncMap;
use crate::output::write_atomic;
use crate::template::render;
use crate::xml::{xml_to_json_with, XmlJsonOptions};

/// Configuration for the XML → PDF pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// XML → JSON naming convention.
    pub xml: XmlJsonOptions,
    /// Browser settings for the print stage.
    pub export: ExportConfig,
}

impl PipelineConfig {
    /// Load a config from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// XML file → rendered template text, without touching the browser.
pub fn xml_to_html(
    xml_path: &Path,
    template_path: &Path,
    extra: Option<&FuncMap>,
    options: &XmlJsonOptions,
) -> Result<String> {
    let xml = fs::read(xml_path)?;
    let json = xml_to_json_with(&xml, options)?;
    log::debug!(
        "converted '{}' to JSON ({} bytes)",
        xml_path.display(),
        json.len()
    );
    render(template_path, &json, extra)
}

/// Full pipeline with the built-in template helpers only.
pub async fn xml_to_pdf(
    xml_path: &Path,
    pdf_path: &Path,
    template_path: &Path,
    temp_html_path: &Path,
    config: &PipelineConfig,
) -> Result<()> {
    convert(xml_path, pdf_path, template_path, temp_html_path, None, config).await
}

/// Full pipeline: XML file → JSON → template → temp HTML file → PDF file.
///
/// `extra` helpers are laid over the built-ins for this call only.
pub async fn convert(
    xml_path: &Path,
    pdf_path: &Path,
    template_path: &Path,
    temp_html_path: &Path,
    extra: Option<&FuncMap>,
    config: &PipelineConfig,
) -> Result<()> {
    // 1–3. Read, convert, render
    let html = xml_to_html(xml_path, template_path, extra, &config.xml)?;

    // 4. Save the page where the browser can load it
    write_atomic(temp_html_path, html.as_bytes())?;

    // 5. The browser needs an absolute file:// URL
    let html_path = std::path::absolute(temp_html_path)?;

    // 6. Print
    render_to_pdf(&html_path, pdf_path, &config.export).await
}

/// [`convert`] on a private single-threaded runtime, for synchronous callers.
///
/// Must not be called from inside a Tokio runtime.
pub fn convert_blocking(
    xml_path: &Path,
    pdf_path: &Path,
    template_path: &Path,
    temp_html_path: &Path,
    extra: Option<&FuncMap>,
    config: &PipelineConfig,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(convert(
        xml_path,
        pdf_path,
        template_path,
        temp_html_path,
        extra,
        config,
    ))
}
