use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::db::{Observation, PriceStore};
use crate::error::StoreError;

pub const MAX_HISTORY_POINTS: usize = 7;

const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";
// UTC+5:30
const DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Chart-ready window: `labels[i]` and `prices[i]` describe `observations[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    pub observations: Vec<Observation>,
    pub labels: Vec<String>,
    pub prices: Vec<f64>,
}

impl PriceHistory {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// Latest `MAX_HISTORY_POINTS` observations for `url`, oldest first.
pub fn build_history(store: &dyn PriceStore, url: &str) -> Result<PriceHistory, StoreError> {
    let mut observations = store.query_recent(url, MAX_HISTORY_POINTS)?;
    observations.reverse();

    let labels = observations.iter().map(|o| display_label(o.observed_at)).collect();
    let prices = observations.iter().map(|o| o.price).collect();

    Ok(PriceHistory { observations, labels, prices })
}

pub fn display_label(at: DateTime<Utc>) -> String {
    at.with_timezone(&display_zone()).format(LABEL_FORMAT).to_string()
}

fn display_zone() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap()
}
