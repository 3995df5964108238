use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    manifest::{SmoothManifest, StreamElement},
    SmoothResult,
};

/// Keeps global chunk indices stable while a live manifest slides forward.
///
/// Every refresh of a live manifest drops chunks at the head of the window and appends new ones
/// at the tail, so local chunk indices restart from zero. The tracker maintains
/// `global = local + chunk_offset` across those refreshes.
#[derive(Debug)]
pub struct LiveWindowTracker {
    manifest: Arc<SmoothManifest>,
    element_index: usize,
    chunk_offset: u64,
    /// Every chunk of the adopted manifest has been handed out.
    exhausted: bool,
}

impl LiveWindowTracker {
    pub fn new(manifest: Arc<SmoothManifest>, element_index: usize) -> SmoothResult<Self> {
        manifest.element(element_index)?;
        Ok(Self {
            manifest,
            element_index,
            chunk_offset: 0,
            exhausted: false,
        })
    }

    pub fn manifest(&self) -> &Arc<SmoothManifest> {
        &self.manifest
    }

    pub fn element(&self) -> &StreamElement {
        // Checked in `new` and `adopt`
        &self.manifest.stream_elements[self.element_index]
    }

    pub fn chunk_offset(&self) -> u64 {
        self.chunk_offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn mark_exhausted(&mut self) {
        if !self.exhausted {
            tracing::debug!(
                chunk_offset = self.chunk_offset,
                chunks = self.element().chunk_count(),
                "Live manifest exhausted"
            );
        }
        self.exhausted = true;
    }

    /// Switches to `manifest` if it is a different snapshot. Returns whether it was adopted.
    pub fn adopt(&mut self, manifest: Arc<SmoothManifest>) -> bool {
        if Arc::ptr_eq(&self.manifest, &manifest) {
            return false;
        }

        let new_element = match manifest.element(self.element_index) {
            Ok(element) => element,
            Err(e) => {
                tracing::warn!("Ignoring refreshed manifest: {e}");
                return false;
            }
        };
        let advance = chunk_offset_advance(self.element(), new_element);
        self.chunk_offset += advance;
        tracing::debug!(
            advance,
            chunk_offset = self.chunk_offset,
            chunks = new_element.chunk_count(),
            "Adopted refreshed manifest"
        );

        self.manifest = manifest;
        self.exhausted = false;
        true
    }

    /// Whether an exhausted manifest is old enough to be refreshed.
    pub fn should_refresh(&self, loaded_at: Instant, now: Instant, min_period: Duration) -> bool {
        self.exhausted && now.saturating_duration_since(loaded_at) > min_period
    }
}

/// Number of chunks of `old` that precede the first chunk of `new`.
///
/// When the two windows do not overlap, every chunk of `old` is considered consumed.
pub fn chunk_offset_advance(old: &StreamElement, new: &StreamElement) -> u64 {
    let old_count = old.chunk_count() as u64;
    if old_count == 0 || new.chunk_count() == 0 {
        return old_count;
    }

    let new_start_us = new.start_time_us(0);
    match old.end_time_us() {
        Some(old_end_us) if old_end_us > new_start_us => old.chunk_index(new_start_us) as u64,
        _ => old_count,
    }
}

/// Where playback of a live presentation starts: `latency_us` behind the furthest chunk end of
/// any stream element. `None` when no element has chunks yet.
pub fn live_seek_position_us(manifest: &SmoothManifest, latency_us: i64) -> Option<i64> {
    manifest
        .stream_elements
        .iter()
        .filter_map(StreamElement::end_time_us)
        .max()
        .map(|edge_us| edge_us - latency_us)
}
