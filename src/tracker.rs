use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::db::{Observation, PriceStore};
use crate::error::TrackError;
use crate::fetch::PageSource;
use crate::history::{self, PriceHistory};
use crate::parser::{self, price, site, site::SiteVariant};

/// Everything the presentation layer needs for one tracking request.
#[derive(Debug, Clone, Serialize)]
pub struct TrackReport {
    pub url: String,
    pub site: SiteVariant,
    pub title: String,
    pub display_price: String,
    pub price: f64,
    pub stored: bool,
    pub image_url: String,
    pub history: PriceHistory,
}

/// Per-URL async locks. Entries are created on first use and dropped by
/// `release` once no request holds or waits on them.
#[derive(Default)]
pub struct UrlLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UrlLocks {
    pub fn lock_for(&self, url: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(url.to_string()).or_default())
    }

    /// Call after dropping the handle from `lock_for`.
    pub fn release(&self, url: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Handles are only cloned under this mutex, so a count of one
        // means nobody else can still reach the entry.
        if locks.get(url).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(url);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct Tracker<F, S> {
    source: F,
    store: S,
    // None: concurrent requests for the same URL may both insert.
    locks: Option<UrlLocks>,
}

impl<F: PageSource, S: PriceStore> Tracker<F, S> {
    pub fn new(source: F, store: S, lock_same_url: bool) -> Self {
        Self {
            source,
            store,
            locks: lock_same_url.then(UrlLocks::default),
        }
    }

    /// Fetch, extract, persist (if the price is valid) and read back history.
    pub async fn track(&self, url: &str) -> Result<TrackReport, TrackError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(TrackError::EmptyUrl);
        }
        if !site::is_trackable(url) {
            return Err(TrackError::UnsupportedSite(site::hostname(url)));
        }

        let Some(locks) = &self.locks else {
            return self.track_unlocked(url).await;
        };
        let lock = locks.lock_for(url);
        let result = {
            let _guard = lock.lock().await;
            self.track_unlocked(url).await
        };
        drop(lock);
        locks.release(url);
        result
    }

    async fn track_unlocked(&self, url: &str) -> Result<TrackReport, TrackError> {
        let html = self.source.fetch(url).await.map_err(|e| {
            warn!(url, error = %e, "Fetch failed");
            TrackError::from(e)
        })?;

        let details = parser::process_page(url, &html);
        if details.site == SiteVariant::Unsupported {
            return Err(TrackError::UnsupportedSite(site::hostname(url)));
        }

        let stored = if details.has_valid_price() {
            self.store.insert(&Observation {
                url: url.to_string(),
                title: details.fields.title.clone(),
                price: details.price,
                observed_at: Utc::now(),
            })?;
            info!(url, price = details.price, "Stored observation");
            true
        } else {
            warn!(url, raw = %details.fields.price_text, "No valid price extracted, not stored");
            false
        };

        let history = history::build_history(&self.store, url)?;

        Ok(TrackReport {
            url: url.to_string(),
            site: details.site,
            display_price: price::display_price(&details.fields.price_text),
            price: details.price,
            stored,
            title: details.fields.title,
            image_url: details.fields.image_url,
            history,
        })
    }

    pub fn history(&self, url: &str) -> Result<PriceHistory, TrackError> {
        Ok(history::build_history(&self.store, url.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::error::FetchError;
    use crate::parser::locator::PLACEHOLDER_IMAGE;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves a fixed page and counts fetches, including how many overlapped.
    struct CannedPage {
        html: Option<String>,
        delay: Duration,
        calls: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CannedPage {
        fn fixture(name: &str) -> Self {
            let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
            Self::html(&html)
        }

        fn html(html: &str) -> Self {
            Self {
                html: Some(html.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self { html: None, ..Self::html("") }
        }

        fn slow_fixture(name: &str) -> Self {
            Self { delay: Duration::from_millis(20), ..Self::fixture(name) }
        }
    }

    impl PageSource for CannedPage {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.html.clone().ok_or(FetchError::Status(503))
        }
    }

    const AMAZON_URL: &str = "https://www.amazon.in/dp/B09B8XJDW5";

    #[tokio::test]
    async fn valid_price_is_stored_and_returned() {
        let t = Tracker::new(CannedPage::fixture("amazon"), MemoryStore::default(), true);
        let report = t.track(AMAZON_URL).await.unwrap();
        assert!(report.stored);
        assert_eq!(report.title, "Echo Dot (5th Gen)");
        assert_eq!(report.display_price, "₹4,499.00");
        assert_eq!(report.history.prices, vec![4499.0]);
        assert_eq!(report.history.labels.len(), 1);
    }

    #[tokio::test]
    async fn currency_prefix_added_when_missing() {
        let t = Tracker::new(CannedPage::fixture("amazon_no_image"), MemoryStore::default(), true);
        let report = t.track(AMAZON_URL).await.unwrap();
        assert_eq!(report.display_price, "₹13,999");
        assert_eq!(report.image_url, PLACEHOLDER_IMAGE);
    }

    #[tokio::test]
    async fn sentinel_price_is_not_persisted() {
        let t = Tracker::new(
            CannedPage::html("<html><body><span id='productTitle'>Gadget</span></body></html>"),
            MemoryStore::default(),
            true,
        );
        let report = t.track(AMAZON_URL).await.unwrap();
        assert!(!report.stored);
        assert_eq!(report.title, "Gadget");
        assert_eq!(report.display_price, "₹0");
        assert!(report.history.is_empty());
        assert_eq!(t.store.len(), 0);
    }

    #[tokio::test]
    async fn unsupported_site_skips_fetch() {
        let source = CannedPage::fixture("amazon");
        let t = Tracker::new(source, MemoryStore::default(), true);
        let err = t.track("https://www.ebay.com/itm/1").await.unwrap_err();
        assert!(matches!(err, TrackError::UnsupportedSite(_)));
        assert_eq!(t.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_url() {
        let t = Tracker::new(CannedPage::fixture("amazon"), MemoryStore::default(), true);
        assert!(matches!(t.track("   ").await, Err(TrackError::EmptyUrl)));
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let t = Tracker::new(CannedPage::failing(), MemoryStore::default(), true);
        let err = t.track(AMAZON_URL).await.unwrap_err();
        assert!(matches!(err, TrackError::Fetch(FetchError::Status(503))));
        assert!(err.to_string().starts_with("Could not fetch the product page."));
        assert_eq!(t.store.len(), 0);
    }

    #[tokio::test]
    async fn history_includes_current_observation() {
        let t = Tracker::new(CannedPage::fixture("flipkart"), MemoryStore::default(), true);
        let url = "https://www.flipkart.com/apple-iphone-15/p/itm123";
        t.track(url).await.unwrap();
        let second = t.track(url).await.unwrap();
        assert_eq!(second.history.prices, vec![65999.0, 65999.0]);
        assert_eq!(t.history(url).unwrap(), second.history);
    }

    #[test]
    fn same_url_shares_a_lock() {
        let locks = UrlLocks::default();
        let a1 = locks.lock_for("a");
        let a2 = locks.lock_for("a");
        let b = locks.lock_for("b");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));

        let _held = a1.try_lock().unwrap();
        assert!(a2.try_lock().is_err());
        assert!(b.try_lock().is_ok());
    }

    #[test]
    fn released_lock_is_removed_only_when_unused() {
        let locks = UrlLocks::default();
        let a1 = locks.lock_for("a");
        let a2 = locks.lock_for("a");
        drop(a1);
        locks.release("a");
        assert_eq!(locks.len(), 1);

        drop(a2);
        locks.release("a");
        assert_eq!(locks.len(), 0);
        locks.release("missing");
    }

    #[tokio::test]
    async fn concurrent_same_url_requests_are_serialized() {
        let t = Tracker::new(CannedPage::slow_fixture("amazon"), MemoryStore::default(), true);

        let (a, b) = tokio::join!(t.track(AMAZON_URL), t.track(AMAZON_URL));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(t.source.peak.load(Ordering::SeqCst), 1);
        // whichever ran second saw the first one's write
        let lens = [a.history.len(), b.history.len()];
        assert!(lens.contains(&1) && lens.contains(&2));
        assert_eq!(t.store.len(), 2);
    }

    #[tokio::test]
    async fn unlocked_same_url_requests_overlap() {
        let t = Tracker::new(CannedPage::slow_fixture("amazon"), MemoryStore::default(), false);

        let (a, b) = tokio::join!(t.track(AMAZON_URL), t.track(AMAZON_URL));
        a.unwrap();
        b.unwrap();
        assert_eq!(t.source.peak.load(Ordering::SeqCst), 2);
        // both fetched before either wrote, and both rows are kept
        assert_eq!(t.store.len(), 2);
    }

    #[tokio::test]
    async fn lock_table_is_empty_after_requests() {
        let t = Tracker::new(CannedPage::slow_fixture("amazon"), MemoryStore::default(), true);
        let other = "https://www.amazon.in/dp/B0OTHER";

        let (a, b, c) = tokio::join!(t.track(AMAZON_URL), t.track(AMAZON_URL), t.track(other));
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert_eq!(t.locks.as_ref().unwrap().len(), 0);

        let failing = Tracker::new(CannedPage::failing(), MemoryStore::default(), true);
        failing.track(AMAZON_URL).await.unwrap_err();
        assert_eq!(failing.locks.as_ref().unwrap().len(), 0);
    }
}
