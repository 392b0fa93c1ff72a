pub mod extract;
pub mod locator;
pub mod price;
pub mod site;

use scraper::Html;
use serde::Serialize;

use extract::RawFields;
use site::SiteVariant;

/// Classifier, extractor and normaliser output for one fetched page.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
    pub site: SiteVariant,
    pub fields: RawFields,
    pub price: f64,
}

impl ProductDetails {
    /// Only pages with a positive price become observations.
    pub fn has_valid_price(&self) -> bool {
        self.price > 0.0
    }
}

/// Three-step pipeline: url → site variant → raw fields → numeric price.
pub fn process_page(url: &str, html: &str) -> ProductDetails {
    let site = site::classify(url);
    let doc = Html::parse_document(html);
    let fields = extract::extract_fields(&doc, site);
    let price = price::parse_price(&fields.price_text);
    ProductDetails { site, fields, price }
}
