//! Headless Chromium backend for [`RenderSession`], driven over CDP.
//!
//! Every session owns a whole browser process: stores scraped concurrently
//! never share cookies, caches, or tabs.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use offerdb_core::AppConfig;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::ScraperError;
use crate::session::{RenderSession, SessionLauncher};

const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

const HIDE_WEBDRIVER_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined })";

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chrome/Chromium binary; `None` lets chromiumoxide search the usual
    /// install locations.
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl BrowserSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            headless: config.browser_headless,
            chrome_path: config.chrome_path.clone(),
            ..Self::default()
        }
    }
}

fn random_user_agent() -> &'static str {
    DESKTOP_USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// Expression that is `true` once `selector` matches a laid-out, visible
/// element.
fn visibility_script(selector: &str) -> Result<String, ScraperError> {
    let quoted = serde_json::to_string(selector)
        .map_err(|e| ScraperError::Browser(format!("cannot encode selector: {e}")))?;
    Ok(format!(
        r"(() => {{
    const el = document.querySelector({quoted});
    if (!el) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 || rect.height > 0;
}})()"
    ))
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.settings.window_width, self.settings.window_height)
            .no_sandbox();

        if let Some(path) = &self.settings.chrome_path {
            builder = builder.chrome_executable(path);
        }

        // with_head means NOT headless
        if !self.settings.headless {
            builder = builder.with_head();
        }

        builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--disable-default-apps")
            .arg("--disable-popup-blocking")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .build()
            .map_err(|e| ScraperError::Browser(format!("invalid browser config: {e}")))
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, ScraperError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::Browser(format!("failed to launch browser: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler stopped");
                    break;
                }
            }
        });

        let page = match open_page(&browser).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(e);
            }
        };

        tracing::debug!(headless = self.settings.headless, "browser session launched");

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task: std::sync::Mutex::new(Some(handler_task)),
        }))
    }
}

async fn open_page(browser: &Browser) -> Result<Page, ScraperError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| ScraperError::Browser(format!("failed to open tab: {e}")))?;
    let user_agent = random_user_agent();
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await
        .map_err(|e| ScraperError::Browser(format!("failed to set user agent: {e}")))?;
    tracing::debug!(user_agent, "user agent selected");
    Ok(page)
}

pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if let Err(e) = self.page.evaluate(HIDE_WEBDRIVER_SCRIPT.to_string()).await {
            tracing::debug!(error = %e, "could not hide navigator.webdriver");
        }
        Ok(())
    }

    async fn wait_visible(&self, selector: &str) -> Result<(), ScraperError> {
        let script = visibility_script(selector)?;
        loop {
            let visible = self
                .page
                .evaluate(script.clone())
                .await
                .map_err(|e| ScraperError::Browser(e.to_string()))?
                .into_value::<bool>()
                .unwrap_or(false);
            if visible {
                return Ok(());
            }
            tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
        }
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, ScraperError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::Extraction {
                selector: selector.to_string(),
                reason: e.to_string(),
            })?;
        element
            .attribute(name)
            .await
            .map_err(|e| ScraperError::Browser(e.to_string()))
    }

    async fn outer_html(&self, selector: &str) -> Result<String, ScraperError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::Extraction {
                selector: selector.to_string(),
                reason: e.to_string(),
            })?;
        element
            .outer_html()
            .await
            .map_err(|e| ScraperError::Browser(e.to_string()))?
            .ok_or_else(|| ScraperError::Extraction {
                selector: selector.to_string(),
                reason: "element has no outer HTML".to_string(),
            })
    }

    async fn close(&self) {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return;
        };
        if let Err(e) = browser.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "browser process wait failed");
        }
        let task = self
            .handler_task
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(task) = task {
            task.abort();
        }
        tracing::debug!("browser session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_quotes_selector_as_js_string() {
        let script = visibility_script("article:nth-child(12)").unwrap();
        assert!(script.contains(r#"document.querySelector("article:nth-child(12)")"#));
    }

    #[test]
    fn script_escapes_quotes_in_selector() {
        let script = visibility_script(r#"a[title="x"]"#).unwrap();
        assert!(script.contains(r#"document.querySelector("a[title=\"x\"]")"#));
    }

    #[test]
    fn user_agent_comes_from_desktop_pool() {
        let ua = random_user_agent();
        assert!(DESKTOP_USER_AGENTS.contains(&ua));
    }

    #[test]
    fn default_settings_are_headless_full_hd() {
        let settings = BrowserSettings::default();
        assert!(settings.headless);
        assert_eq!((settings.window_width, settings.window_height), (1920, 1080));
    }

    #[test]
    fn browser_config_accepts_explicit_executable() {
        let launcher = ChromiumLauncher::new(BrowserSettings {
            chrome_path: Some(PathBuf::from("/usr/bin/chromium")),
            ..BrowserSettings::default()
        });
        assert!(launcher.browser_config().is_ok());
    }
}
