use std::fmt;

use serde::Serialize;

/// Hostname fragments eligible for tracking at all.
pub const SUPPORTED_DOMAINS: &[&str] = &["flipkart.com", "amazon.", "amzn."];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SiteVariant {
    Flipkart,
    Amazon,
    Unsupported,
}

impl fmt::Display for SiteVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteVariant::Flipkart => "flipkart",
            SiteVariant::Amazon => "amazon",
            SiteVariant::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Classify a product URL by substring tests on its hostname, in priority order.
pub fn classify(url: &str) -> SiteVariant {
    let host = hostname(url);
    match host.as_str() {
        h if h.contains("flipkart.com") => SiteVariant::Flipkart,
        h if h.contains("amazon.") || h.contains("amzn.") => SiteVariant::Amazon,
        _ => SiteVariant::Unsupported,
    }
}

/// Upstream gate: is this URL on any tracked domain family?
pub fn is_trackable(url: &str) -> bool {
    let host = hostname(url);
    SUPPORTED_DOMAINS.iter().any(|d| host.contains(d))
}

/// Lowercased hostname, or empty when the URL does not parse.
pub fn hostname(url: &str) -> String {
    reqwest::Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sites() {
        assert_eq!(classify("https://www.amazon.in/dp/XYZ"), SiteVariant::Amazon);
        assert_eq!(classify("https://www.flipkart.com/p/abc"), SiteVariant::Flipkart);
        assert_eq!(classify("https://example.com/x"), SiteVariant::Unsupported);
    }

    #[test]
    fn subdomains_and_short_links() {
        assert_eq!(classify("https://dl.flipkart.com/s/abc"), SiteVariant::Flipkart);
        assert_eq!(classify("https://amzn.eu/d/abc"), SiteVariant::Amazon);
        assert_eq!(classify("https://www.amazon.co.uk/dp/B01"), SiteVariant::Amazon);
    }

    #[test]
    fn only_hostname_is_inspected() {
        assert_eq!(
            classify("https://example.com/amazon.in/flipkart.com"),
            SiteVariant::Unsupported
        );
        assert!(!is_trackable("https://example.com/?ref=amazon.in"));
    }

    #[test]
    fn unparsable_url() {
        assert_eq!(classify("not a url"), SiteVariant::Unsupported);
        assert!(!is_trackable(""));
        assert_eq!(hostname("nope"), "");
    }

    #[test]
    fn gate_matches_classifier_families() {
        assert!(is_trackable("https://WWW.AMAZON.IN/dp/1"));
        assert!(is_trackable("https://www.flipkart.com/p/1"));
        assert!(!is_trackable("https://www.ebay.com/itm/1"));
    }
}
