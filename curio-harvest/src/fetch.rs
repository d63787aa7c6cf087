use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Pause after scrolling, to let lazy-loaded content render.
pub const SCROLL_PAUSE: Duration = Duration::from_millis(1500);
/// Settle time after DOM mutations (pagination clicks, initial render).
pub const SETTLE_PAUSE: Duration = Duration::from_secs(2);
/// Upper bound for a full browser page load.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A pagination control to activate, either a plain CSS selector or a
/// text match over visible anchors/buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Css(&'static str),
    Text(&'static str),
}

/// Abstraction over a stateful, renderable page the pagination driver can
/// steer. Implemented by `BrowserSession`; tests provide scripted fakes.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to a URL and wait for the initial load.
    async fn load(&mut self, url: &str) -> Result<()>;

    /// Scroll to the bottom and wait for asynchronous rendering to settle.
    async fn settle(&mut self) -> Result<()>;

    /// Snapshot of the current DOM as an HTML string.
    async fn html(&mut self) -> Result<String>;

    /// Try to activate a "next page" / "load more" control. Returns true if
    /// a currently-visible element matched and was activated.
    async fn activate(&mut self, control: &NextControl) -> Result<bool>;
}

/// Plain HTTP fetcher for static sites.
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs / 2))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch a URL and return the response body as HTML.
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Other(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        Ok(response.text().await?)
    }

    /// Advisory robots.txt check. Never blocks a scrape, only informs the
    /// caller so it can log a warning.
    pub async fn robots_allowed(&self, site_url: &str) -> bool {
        let robots_url = match Url::parse(site_url).and_then(|u| u.join("/robots.txt")) {
            Ok(u) => u,
            Err(_) => return true,
        };

        let body = match self.client.get(robots_url.as_str()).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => body,
                Err(_) => return true,
            },
            _ => return true,
        };

        let path = Url::parse(site_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string());

        robots_path_allowed(&body, &path)
    }
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal robots.txt evaluation: Disallow prefixes under `User-agent: *`.
fn robots_path_allowed(robots_body: &str, path: &str) -> bool {
    let mut applies = false;
    for line in robots_body.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if let Some(agent) = line.strip_prefix("User-agent:").map(str::trim) {
            applies = agent == "*";
        } else if applies
            && let Some(prefix) = line.strip_prefix("Disallow:").map(str::trim)
            && !prefix.is_empty()
            && path.starts_with(prefix)
        {
            return false;
        }
    }
    true
}

/// Markers suggesting the page body is assembled client-side.
const JS_MARKERS: &[&str] = &[
    "react",
    "vue",
    "angular",
    "next.js",
    "nuxt",
    "data-react",
    "data-vue",
    "ng-",
    "v-bind",
    "window.__initial_state__",
];

/// Heuristic: does this page require JavaScript rendering to show content?
/// True when a framework marker is present or the static text content is
/// too thin to be a real catalog page.
pub fn requires_javascript(html: &str) -> bool {
    let lowered = html.to_lowercase();
    for marker in JS_MARKERS {
        if lowered.contains(marker) {
            debug!("Detected JavaScript framework marker: {}", marker);
            return true;
        }
    }

    let document = scraper::Html::parse_document(html);
    let text_len: usize = document
        .root_element()
        .text()
        .map(|t| t.trim().len())
        .sum();
    if text_len < 500 {
        debug!("Page has minimal static content ({} chars)", text_len);
        return true;
    }

    false
}

/// A headless-browser session: one browser process and one page, owned
/// exclusively by a single scrape run. Callers must `close()` it on every
/// exit path to avoid leaking the OS-level browser process.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch() -> Result<Self> {
        let mut config = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");

        if let Ok(path) = std::env::var("CURIO_CHROME_PATH") {
            config = config.chrome_executable(path);
        }

        let config = config
            .build()
            .map_err(|e| HarvestError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser.new_page("about:blank").await?;

        info!("Launched headless browser session");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Evaluate a JS expression on the page, returning its value.
    async fn evaluate_bool(&self, script: &str) -> Result<bool> {
        let result = self.page.evaluate(script).await?;
        result
            .into_value::<bool>()
            .map_err(|e| HarvestError::Browser(format!("failed to convert JS result: {e:?}")))
    }

    /// Scroll to the bottom repeatedly until the document height stops
    /// growing (bounded), to trigger infinite-scroll and lazy loading.
    async fn scroll_to_bottom(&self) -> Result<()> {
        let mut last_height: i64 = 0;
        for _ in 0..6 {
            let height = self
                .page
                .evaluate(
                    "(() => { window.scrollTo(0, document.body.scrollHeight); \
                     return document.body.scrollHeight; })()",
                )
                .await?
                .into_value::<i64>()
                .unwrap_or(0);

            tokio::time::sleep(SCROLL_PAUSE).await;
            if height == last_height {
                break;
            }
            last_height = height;
        }
        Ok(())
    }

    /// Tear down the page and browser process. Errors are surfaced so the
    /// caller can log them, but by contract they must never mask the
    /// primary scrape result.
    pub async fn close(mut self) -> Result<()> {
        let page_result = self.page.close().await;
        let browser_result = self.browser.close().await;
        self.handler.abort();
        page_result?;
        browser_result?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn load(&mut self, url: &str) -> Result<()> {
        debug!("Browser loading {}", url);
        tokio::time::timeout(LOAD_TIMEOUT, self.page.goto(url))
            .await
            .map_err(|_| HarvestError::Browser(format!("page load timed out: {url}")))??;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn settle(&mut self) -> Result<()> {
        self.scroll_to_bottom().await?;
        tokio::time::sleep(SETTLE_PAUSE).await;
        Ok(())
    }

    async fn html(&mut self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await?;
        result
            .into_value::<String>()
            .map_err(|e| HarvestError::Browser(format!("failed to convert HTML result: {e:?}")))
    }

    async fn activate(&mut self, control: &NextControl) -> Result<bool> {
        let script = match control {
            NextControl::Css(selector) => format!(
                "(() => {{ const el = document.querySelector(\"{selector}\"); \
                 if (el && el.offsetParent !== null) {{ el.click(); return true; }} \
                 return false; }})()"
            ),
            NextControl::Text(needle) => format!(
                "(() => {{ \
                 for (const el of document.querySelectorAll('a, button')) {{ \
                   if (el.offsetParent !== null && \
                       el.textContent.trim().toLowerCase().includes(\"{needle}\")) {{ \
                     el.click(); return true; }} }} \
                 return false; }})()"
            ),
        };

        match self.evaluate_bool(&script).await {
            Ok(clicked) => Ok(clicked),
            Err(e) => {
                warn!("Pagination control activation failed: {}", e);
                Ok(false)
            }
        }
    }
}
