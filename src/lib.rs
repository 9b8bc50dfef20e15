//! # xml-pdf-forge – XML → template → PDF pipeline
//!
//! This crate turns an XML document into a PDF by way of an HTML template.
//! The pipeline stages are:
//!
//! 1. **Convert** – XML bytes → JSON tree ([`xml`])
//! 2. **Render** – JSON under `data` + template file → HTML ([`template`],
//!    with helpers from [`funcs`])
//! 3. **Stage** – HTML written to a temp file ([`output`])
//! 4. **Print** – headless Chromium prints the file to PDF ([`export`])
//!
//! [`pipeline`] runs all stages in order and stops at the first error.

pub mod error;
pub mod export;
pub mod funcs;
pub mod output;
pub mod pipeline;
pub mod samples;
pub mod strip;
pub mod template;
pub mod xml;

// Re-exports for convenience
pub use error::{ForgeError, Result};
pub use export::{render_to_pdf, ExportConfig};
pub use funcs::{FuncError, FuncMap, FuncResult, TemplateFn};
pub use pipeline::{convert, convert_blocking, xml_to_pdf, PipelineConfig};
pub use template::{render, render_template};
pub use xml::{xml_to_json, XmlJsonOptions};
