//! PDF exporter – prints an HTML file through headless Chromium.
//!
//! Every call owns one browser process and one throw-away profile
//! directory. The session is closed on success and on every error path;
//! dropping the future mid-flight still kills the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{ForgeError, Result};
use crate::output::write_atomic;

/// User agent announced while loading the page.
pub const DEFAULT_USER_AGENT: &str = "WebScraper 1.0";

/// Header shown on every page: intentionally empty.
pub const HEADER_TEMPLATE: &str = r#"<div style="font-size:8px;width:100%;text-align:center;"></div>"#;

/// True once `document.body` exists and has a layout box.
const BODY_VISIBLE: &str = "(() => { const b = document.body; \
     return !!b && Boolean(b.offsetWidth || b.offsetHeight || b.getClientRects().length); })()";

/// Browser settings for [`render_to_pdf`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// User agent for the page load (default: `WebScraper 1.0`).
    pub user_agent: String,
    /// Upper bound for navigation plus waiting for a visible `<body>`.
    #[serde(rename = "ready_timeout_ms", with = "millis")]
    pub ready_timeout: Duration,
    /// Delay between `<body>` visibility checks.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
    /// Browser binary; auto-detected when `None`.
    pub chrome_executable: Option<PathBuf>,
    /// Run Chromium with its sandbox. Containers running as root usually
    /// need this off.
    pub sandbox: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            ready_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
            chrome_executable: None,
            sandbox: true,
        }
    }
}

/// Print `source` (an HTML file) to `destination` as PDF.
///
/// The footer shows the page title, the destination's file name and
/// `(page / total)`.
pub async fn render_to_pdf(source: &Path, destination: &Path, config: &ExportConfig) -> Result<()> {
    let url = file_url(source)?;
    let footer = footer_template(destination);
    log::debug!("printing {url} to '{}'", destination.display());

    let mut session = BrowserSession::launch(config).await?;
    let printed = session.print(&url, &footer, config).await;
    session.close().await;

    let pdf = printed?;
    write_atomic(destination, &pdf)?;
    log::info!("wrote '{}' ({} bytes)", destination.display(), pdf.len());
    Ok(())
}

/// Footer with the destination's base name between the page title and the
/// page counter.
pub fn footer_template(destination: &Path) -> String {
    let base = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        r#"<div style="font-size:8px;width:100%;text-align:center;margin: 0mm 8mm 0mm 8mm;"><span style="float:left"><span class="title"></span> - <span >{}</span></span><span style="float:right">(<span class="pageNumber"></span> / <span class="totalPages"></span>)</span></div>"#,
        html_escape::encode_text(&base)
    )
}

/// `file://` URL for `path`, resolved against the working directory.
pub fn file_url(path: &Path) -> Result<Url> {
    let absolute = std::path::absolute(path)?;
    Url::from_file_path(&absolute).map_err(|_| ForgeError::FileUrl(absolute))
}

// ---------------------------------------------------------------------------
// Browser session
// ---------------------------------------------------------------------------

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl BrowserSession {
    async fn launch(config: &ExportConfig) -> Result<Self> {
        let profile = tempfile::Builder::new().prefix("forge-chrome-").tempdir()?;

        let mut builder = BrowserConfig::builder().user_data_dir(profile.path());
        if let Some(exe) = &config.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        let browser_config = builder.build().map_err(ForgeError::BrowserConfig)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("browser event error: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    async fn print(&self, url: &Url, footer: &str, config: &ExportConfig) -> Result<Vec<u8>> {
        let page = self.browser.new_page("about:blank").await?;
        page.set_user_agent(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await?;

        match tokio::time::timeout(
            config.ready_timeout,
            load_and_wait(&page, url, config.poll_interval),
        )
        .await
        {
            Ok(loaded) => loaded?,
            Err(_) => return Err(ForgeError::Timeout(config.ready_timeout)),
        }

        let params = PrintToPdfParams {
            display_header_footer: Some(true),
            header_template: Some(HEADER_TEMPLATE.to_string()),
            footer_template: Some(footer.to_string()),
            print_background: Some(true),
            ..Default::default()
        };
        Ok(page.pdf(params).await?)
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            log::warn!("closing browser failed: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            log::warn!("waiting for browser exit failed: {e}");
        }
        if let Err(e) = (&mut self.handler).await {
            log::debug!("browser handler ended abnormally: {e}");
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn load_and_wait(page: &Page, url: &Url, poll: Duration) -> Result<()> {
    page.goto(url.as_str()).await?;
    loop {
        let visible: bool = page.evaluate(BODY_VISIBLE).await?.into_value()?;
        if visible {
            return Ok(());
        }
        tokio::time::sleep(poll).await;
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
