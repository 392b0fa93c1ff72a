use anyhow::Result;
use config::Config;
use serde::Deserialize;

const ENV_PREFIX: &str = "PRICE_TRACKER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_scraper_api_url")]
    pub scraper_api_url: String,
    #[serde(default)]
    pub scraper_api_key: Option<String>,
    #[serde(default)]
    pub spider_api_key: Option<String>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_lock_same_url")]
    pub lock_same_url: bool,
}

fn default_database_path() -> String {
    "data/prices.sqlite".into()
}

fn default_scraper_api_url() -> String {
    "https://api.scraperapi.com".into()
}

fn default_fetch_timeout_secs() -> u64 {
    25
}

fn default_concurrency() -> usize {
    4
}

fn default_lock_same_url() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            scraper_api_url: default_scraper_api_url(),
            scraper_api_key: None,
            spider_api_key: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            concurrency: default_concurrency(),
            lock_same_url: default_lock_same_url(),
        }
    }
}

impl Settings {
    /// Load `.env` (if any), then `PRICE_TRACKER_*` environment variables.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();
        let settings = Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings.normalized())
    }

    // Blank keys in .env files come through as empty strings.
    fn normalized(mut self) -> Self {
        self.scraper_api_key = self.scraper_api_key.filter(|k| !k.trim().is_empty());
        self.spider_api_key = self.spider_api_key.filter(|k| !k.trim().is_empty());
        self.concurrency = self.concurrency.max(1);
        self
    }
}
