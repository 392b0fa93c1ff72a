use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use spider_client::shapes::request::{RequestType, ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::info;

use crate::config::Settings;
use crate::error::FetchError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0.0.0 Safari/537.36";
const BROWSER_LANGUAGE: &str = "en-US,en;q=0.9";

/// Anything that can turn a product URL into raw HTML.
pub trait PageSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Picks a strategy from settings: ScraperAPI key, then spider.cloud key, else direct.
pub enum Fetcher {
    Direct(DirectFetcher),
    ScraperApi(ScraperApiFetcher),
    Spider(SpiderFetcher),
}

impl Fetcher {
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(settings.fetch_timeout_secs);
        if let Some(key) = &settings.scraper_api_key {
            return Ok(Fetcher::ScraperApi(ScraperApiFetcher::new(
                &settings.scraper_api_url,
                key,
                timeout,
            )?));
        }
        if let Some(key) = &settings.spider_api_key {
            return Ok(Fetcher::Spider(SpiderFetcher::new(key, timeout)?));
        }
        Ok(Fetcher::Direct(DirectFetcher::new(timeout)?))
    }
}

impl PageSource for Fetcher {
    fn name(&self) -> &'static str {
        match self {
            Fetcher::Direct(f) => f.name(),
            Fetcher::ScraperApi(f) => f.name(),
            Fetcher::Spider(f) => f.name(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let html = match self {
            Fetcher::Direct(f) => f.fetch(url).await?,
            Fetcher::ScraperApi(f) => f.fetch(url).await?,
            Fetcher::Spider(f) => f.fetch(url).await?,
        };
        info!(url, strategy = self.name(), bytes = html.len(), "Fetched product page");
        Ok(html)
    }
}

// ── Direct ──

pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_LANGUAGE));
        let client = Client::builder().default_headers(headers).timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl PageSource for DirectFetcher {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        read_body(response).await
    }
}

// ── ScraperAPI-style rendering proxy ──

pub struct ScraperApiFetcher {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ScraperApiFetcher {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn query<'a>(&'a self, url: &'a str) -> [(&'static str, &'a str); 3] {
        [("api_key", self.api_key.as_str()), ("url", url), ("render", "true")]
    }
}

impl PageSource for ScraperApiFetcher {
    fn name(&self) -> &'static str {
        "scraper_api"
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(&self.endpoint).query(&self.query(url)).send().await?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody);
    }
    Ok(body)
}

// ── spider.cloud ──

pub struct SpiderFetcher {
    spider: Spider,
    timeout: Duration,
}

impl SpiderFetcher {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        let spider = Spider::new(Some(api_key.to_string()))
            .map_err(|e| FetchError::Spider(format!("failed to create client: {}", e)))?;
        Ok(Self { spider, timeout })
    }
}

impl PageSource for SpiderFetcher {
    fn name(&self) -> &'static str {
        "spider"
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        // Raw HTML from a headless browser so script-rendered prices are present.
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            request: Some(RequestType::Chrome),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.spider.scrape_url(url, Some(params), "application/json"),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| FetchError::Spider(e.to_string()))?;

        spider_content(response)
    }
}

/// Pull the page body out of a spider.cloud JSON response.
fn spider_content(response: serde_json::Value) -> Result<String, FetchError> {
    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };

    let first = parsed.as_array().and_then(|arr| arr.first());

    if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_u64()) {
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status as u16));
        }
    }

    first
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .ok_or(FetchError::EmptyBody)
}
