use crate::parser::locator::*;

use super::SiteProfile;

pub fn profile() -> SiteProfile {
    SiteProfile {
        title: LocatorChain::new(
            "title",
            TITLE_DEFAULT,
            vec![
                Locator::new(r#"meta[property="og:title"]"#, TITLE_PICKS),
                Locator::new("span.B_NuCI", TITLE_PICKS),
            ],
        ),
        price: LocatorChain::new(
            "price",
            PRICE_DEFAULT,
            vec![
                Locator::new("div._30jeq3._16Jk6d", TEXT_PICKS),
                Locator::new("div.Nx9bqj.CxhGGd", TEXT_PICKS),
                Locator::new("div._25b18c ._30jeq3", TEXT_PICKS),
            ],
        ),
        image: LocatorChain::new(
            "image",
            PLACEHOLDER_IMAGE,
            vec![
                Locator::new(r#"meta[property="og:image"]"#, IMAGE_PICKS),
                Locator::new("img._396cs4._2amPTt._3qGmMb", IMAGE_PICKS),
            ],
        ),
    }
}
