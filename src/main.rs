//! forge – command-line XML → PDF converter.
//!
//! Usage:
//!   forge <input.xml> <template> [output.pdf] [--temp page.html] [--timeout 30]
//!
//! If `output.pdf` is omitted the PDF is written next to the input file with
//! the same stem (e.g. `invoice.xml` → `invoice.pdf`). The rendered HTML is
//! kept next to the output (`invoice.html`) unless `--temp` says otherwise.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;

use xml_pdf_forge::pipeline::{xml_to_html, xml_to_pdf, PipelineConfig};
use xml_pdf_forge::xml::xml_to_json_with;

#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "XML to PDF through an HTML template and headless Chromium", long_about = None)]
struct Cli {
    /// XML file to convert
    input: PathBuf,

    /// Template file (Tera syntax; the XML is available as `data`)
    template: PathBuf,

    /// Output PDF (default: same stem as input with .pdf)
    output: Option<PathBuf>,

    /// Where to keep the rendered HTML (default: output with .html)
    #[arg(long, value_name = "FILE")]
    temp: Option<PathBuf>,

    /// JSON pipeline config; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds to wait for the page to load before giving up
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Chrome/Chromium binary (default: auto-detect)
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Launch the browser without its sandbox (needed as root in containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Print the intermediate JSON and stop
    #[arg(long, conflicts_with = "html_only")]
    json_only: bool,

    /// Render the HTML to the temp file and stop
    #[arg(long)]
    html_only: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match PipelineConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading config '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };
    if let Some(secs) = cli.timeout {
        config.export.ready_timeout = Duration::from_secs(secs);
    }
    if let Some(chrome) = &cli.chrome {
        config.export.chrome_executable = Some(chrome.clone());
    }
    if cli.no_sandbox {
        config.export.sandbox = false;
    }

    if cli.json_only {
        let result = std::fs::read(&cli.input)
            .map_err(Into::into)
            .and_then(|xml| xml_to_json_with(&xml, &config.xml));
        match result {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error converting '{}': {e}", cli.input.display());
                process::exit(1);
            }
        }
        return;
    }

    // Default output: same directory + same stem as input, but with .pdf
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("pdf"));
    let temp = cli
        .temp
        .clone()
        .unwrap_or_else(|| output.with_extension("html"));

    if let Err(e) = ensure_parent(&output).and_then(|()| ensure_parent(&temp)) {
        eprintln!("Error creating output directory: {e}");
        process::exit(1);
    }

    if cli.html_only {
        let html = match xml_to_html(&cli.input, &cli.template, None, &config.xml) {
            Ok(html) => html,
            Err(e) => {
                eprintln!("Error rendering '{}': {e}", cli.template.display());
                process::exit(1);
            }
        };
        if let Err(e) = xml_pdf_forge::output::write_atomic(&temp, html.as_bytes()) {
            eprintln!("Error writing '{}': {e}", temp.display());
            process::exit(1);
        }
        eprintln!("Wrote '{}' ({} bytes)", temp.display(), html.len());
        return;
    }

    match xml_to_pdf(&cli.input, &output, &cli.template, &temp, &config).await {
        Ok(()) => {
            let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
            eprintln!("Wrote '{}' ({size} bytes)", output.display());
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
