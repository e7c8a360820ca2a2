//! Headless-browser fetcher.
//!
//! Drives Chrome over the DevTools protocol so pages that need scripts to
//! render arrive as their final DOM. It reuses the configured user agent so
//! the session looks like the one the cookie came from.

#[cfg(feature = "browser")]
use std::path::{Path, PathBuf};
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::fetcher::{FetchError, FetchRequest, FetchResponse, PageFetcher};
use crate::config::BrowserSettings;

/// Fetcher backed by a real Chrome instance, launched lazily on first use.
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    settings: BrowserSettings,
    user_agent: String,
    browser: Mutex<Option<Browser>>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(settings: BrowserSettings, user_agent: impl Into<String>) -> Self {
        Self {
            settings,
            user_agent: user_agent.into(),
            browser: Mutex::new(None),
        }
    }

    fn find_chrome() -> Result<PathBuf, FetchError> {
        Self::CHROME_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                FetchError::Browser(
                    "Chrome/Chromium not found; install it or set browser.remote_url".to_string(),
                )
            })
    }

    async fn launch(&self) -> Result<Browser, FetchError> {
        if let Some(remote_url) = &self.settings.remote_url {
            return self.connect_remote(remote_url).await;
        }

        let chrome_path = Self::find_chrome()?;
        info!(
            "Launching browser {} (headless={})",
            chrome_path.display(),
            self.settings.headless
        );

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(Duration::from_secs(self.settings.timeout))
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");
        if !self.settings.headless {
            builder = builder.with_head();
        }
        for arg in &self.settings.chrome_args {
            builder = builder.arg(arg);
        }
        let config = builder.build().map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(format!("Failed to launch browser: {}", e)))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    async fn connect_remote(&self, url: &str) -> Result<Browser, FetchError> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));
        let version: serde_json::Value = reqwest::get(&version_url).await?.json().await?;
        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Browser("No webSocketDebuggerUrl in response".into()))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.settings.timeout),
            ..Default::default()
        };
        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| FetchError::Browser(format!("Failed to connect: {}", e)))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    async fn render(&self, browser: &Browser, request: &FetchRequest) -> Result<String, FetchError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let mut nav = NavigateParams::builder().url(request.url.clone());
        if let Some((_, referer)) = request
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("referer"))
        {
            nav = nav.referrer(referer.clone());
        }
        let nav = nav.build().map_err(FetchError::Browser)?;

        debug!("Navigating to {}", request.url);
        let timeout = Duration::from_secs(self.settings.timeout);
        let loaded = tokio::time::timeout(timeout, async {
            page.execute(nav).await?;
            page.wait_for_navigation().await?;
            page.content().await
        })
        .await;
        let _ = page.close().await;

        match loaded {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(FetchError::Browser(e.to_string())),
            Err(_) => Err(FetchError::Browser(format!(
                "Timed out after {}s loading {}",
                self.settings.timeout, request.url
            ))),
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let Some(browser) = guard.as_ref() else {
            return Err(FetchError::Browser("browser unavailable".into()));
        };

        let body = self.render(browser, request).await?;
        Ok(FetchResponse {
            // DevTools does not hand back the document status here; a rendered
            // page is treated as a success and left to challenge detection.
            status: 200,
            body,
            content_encoding: None,
        })
    }

    fn name(&self) -> &str {
        "browser"
    }
}

/// Stand-in used when the crate is built without the `browser` feature.
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    _settings: BrowserSettings,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(settings: BrowserSettings, _user_agent: impl Into<String>) -> Self {
        Self {
            _settings: settings,
        }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        Err(FetchError::Browser(
            "Browser support not compiled. Rebuild with: cargo build --features browser".into(),
        ))
    }

    fn name(&self) -> &str {
        "browser"
    }
}
