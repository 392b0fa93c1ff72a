use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("spider request failed: {0}")]
    Spider(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("empty response body")]
    EmptyBody,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("observation price must be positive, got {0}")]
    NonPositivePrice(f64),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Failures that abort a single tracking request. Everything else
/// (missing fields, sentinel price) degrades to defaults instead.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Please provide a product URL.")]
    EmptyUrl,
    #[error("Currently we can track Amazon or Flipkart product links.")]
    UnsupportedSite(String),
    #[error("Could not fetch the product page. {0}")]
    Fetch(#[from] FetchError),
    #[error("Could not save or read price history. {0}")]
    Store(#[from] StoreError),
}
