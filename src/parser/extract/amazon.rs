use crate::parser::locator::*;

use super::SiteProfile;

pub fn profile() -> SiteProfile {
    SiteProfile {
        title: LocatorChain::new(
            "title",
            TITLE_DEFAULT,
            vec![
                Locator::new("#productTitle", TITLE_PICKS),
                Locator::new("span#title", TITLE_PICKS),
            ],
        ),
        price: LocatorChain::new(
            "price",
            PRICE_DEFAULT,
            vec![
                Locator::new("#corePriceDisplay_desktop_feature_div span.a-offscreen", TEXT_PICKS),
                Locator::new(".a-price .a-offscreen", TEXT_PICKS),
                Locator::new("span.a-price-whole", TEXT_PICKS),
            ],
        ),
        // The landing image carries no og:image content, so its src is read.
        image: LocatorChain::new(
            "image",
            PLACEHOLDER_IMAGE,
            vec![
                Locator::new("#landingImage", IMAGE_PICKS),
                Locator::new(r#"meta[property="og:image"]"#, IMAGE_PICKS),
            ],
        ),
    }
}
