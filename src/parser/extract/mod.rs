pub mod amazon;
pub mod flipkart;

use std::sync::LazyLock;

use scraper::Html;
use serde::Serialize;

use super::locator::{LocatorChain, PLACEHOLDER_IMAGE};
use super::site::SiteVariant;

pub const UNSUPPORTED_TITLE: &str = "Unsupported website";

static FLIPKART: LazyLock<SiteProfile> = LazyLock::new(flipkart::profile);
static AMAZON: LazyLock<SiteProfile> = LazyLock::new(amazon::profile);

/// One locator chain per field for a site variant.
pub struct SiteProfile {
    pub title: LocatorChain,
    pub price: LocatorChain,
    pub image: LocatorChain,
}

/// Field values as found in the markup, before price normalisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFields {
    pub title: String,
    pub price_text: String,
    pub image_url: String,
}

impl RawFields {
    fn unsupported() -> Self {
        Self {
            title: UNSUPPORTED_TITLE.to_string(),
            price_text: "0".to_string(),
            image_url: PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

pub fn profile_for(variant: SiteVariant) -> Option<&'static SiteProfile> {
    match variant {
        SiteVariant::Flipkart => Some(&*FLIPKART),
        SiteVariant::Amazon => Some(&*AMAZON),
        SiteVariant::Unsupported => None,
    }
}

/// Never fails: missing fields fall back to their chain defaults.
pub fn extract_fields(doc: &Html, variant: SiteVariant) -> RawFields {
    let Some(profile) = profile_for(variant) else {
        return RawFields::unsupported();
    };
    RawFields {
        title: profile.title.resolve(doc),
        price_text: profile.price.resolve(doc),
        image_url: profile.image.resolve(doc),
    }
}
