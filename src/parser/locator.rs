use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const TITLE_DEFAULT: &str = "Not found";
pub const PRICE_DEFAULT: &str = "0";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300?text=Image+Not+Found";

/// What to read from a matched node, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Attr(&'static str),
    Text,
}

/// Metadata tags first, then the visible markup.
pub const TITLE_PICKS: &[Pick] = &[Pick::Attr("content"), Pick::Text];
pub const IMAGE_PICKS: &[Pick] = &[Pick::Attr("content"), Pick::Attr("src")];
pub const TEXT_PICKS: &[Pick] = &[Pick::Text];

pub struct Locator {
    pub css: &'static str,
    selector: Selector,
    picks: &'static [Pick],
}

impl Locator {
    pub fn new(css: &'static str, picks: &'static [Pick]) -> Self {
        // Chains are built from string literals covered by tests.
        let selector = Selector::parse(css).unwrap();
        Self { css, selector, picks }
    }

    /// Value of the first matching node, or `None` if the node or every
    /// picked attribute is missing. An existing node with empty text or an
    /// empty attribute still matches.
    pub fn locate(&self, doc: &Html) -> Option<String> {
        let node = doc.select(&self.selector).next()?;
        self.picks.iter().find_map(|pick| read(node, *pick))
    }
}

fn read(node: ElementRef<'_>, pick: Pick) -> Option<String> {
    match pick {
        Pick::Attr(name) => node.value().attr(name).map(|v| v.trim().to_string()),
        Pick::Text => Some(node.text().map(str::trim).collect()),
    }
}

/// Ordered fallback rules for one field; first match wins.
pub struct LocatorChain {
    pub field: &'static str,
    pub locators: Vec<Locator>,
    pub default: &'static str,
}

impl LocatorChain {
    pub fn new(field: &'static str, default: &'static str, locators: Vec<Locator>) -> Self {
        Self { field, locators, default }
    }

    pub fn resolve(&self, doc: &Html) -> String {
        for (idx, locator) in self.locators.iter().enumerate() {
            if let Some(value) = locator.locate(doc) {
                debug!(field = self.field, idx, selector = locator.css, "locator matched");
                return value;
            }
        }
        debug!(field = self.field, "locator chain exhausted, using default");
        self.default.to_string()
    }
}
