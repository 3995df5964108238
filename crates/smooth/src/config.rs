use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum time between two manifest refreshes triggered by an exhausted live manifest.
pub const MINIMUM_MANIFEST_REFRESH_PERIOD_MS: u64 = 5000;

/// Default distance kept from the live edge when joining a live presentation.
pub const DEFAULT_LIVE_EDGE_LATENCY_MS: u64 = 30000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothSourceConfig {
    /// Index of the `StreamIndex` this source provides chunks for.
    pub stream_element_index: usize,
    /// Quality levels to choose from. `None` selects every quality level of the element.
    pub track_indices: Option<Vec<usize>>,
    /// How far playback lags behind the live edge when a live presentation starts.
    ///
    /// A small value reduces latency but also bounds how much media can be buffered, which makes
    /// rebuffering more likely.
    pub live_edge_latency_ms: u64,
    pub min_manifest_refresh_period_ms: u64,
}

impl Default for SmoothSourceConfig {
    fn default() -> Self {
        Self {
            stream_element_index: 0,
            track_indices: None,
            live_edge_latency_ms: DEFAULT_LIVE_EDGE_LATENCY_MS,
            min_manifest_refresh_period_ms: MINIMUM_MANIFEST_REFRESH_PERIOD_MS,
        }
    }
}

impl SmoothSourceConfig {
    pub fn new(stream_element_index: usize) -> Self {
        Self {
            stream_element_index,
            ..Default::default()
        }
    }

    pub fn with_track_indices(mut self, track_indices: Vec<usize>) -> Self {
        self.track_indices = Some(track_indices);
        self
    }

    pub fn with_live_edge_latency_ms(mut self, latency_ms: u64) -> Self {
        self.live_edge_latency_ms = latency_ms;
        self
    }

    pub fn with_min_manifest_refresh_period_ms(mut self, period_ms: u64) -> Self {
        self.min_manifest_refresh_period_ms = period_ms;
        self
    }

    pub fn live_edge_latency_us(&self) -> i64 {
        self.live_edge_latency_ms as i64 * 1000
    }

    pub fn min_manifest_refresh_period(&self) -> Duration {
        Duration::from_millis(self.min_manifest_refresh_period_ms)
    }
}
