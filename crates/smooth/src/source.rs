use std::{sync::Arc, time::Instant};

use crate::{
    catalog::{TrackCatalog, TrackInfo},
    chunk::{ChunkOperation, DataSource, DataSpec, MediaChunk},
    config::SmoothSourceConfig,
    evaluator::{Evaluation, FormatEvaluator},
    fetcher::ManifestFetcher,
    live::{live_seek_position_us, LiveWindowTracker},
    manifest::{Format, SmoothManifest},
    SmoothError, SmoothResult, SourceError,
};

/// Produces the next chunk request of one Smooth Streaming stream element.
///
/// The source is poll driven and never blocks. See the crate documentation for the data flow.
///
/// Chunk indices carried by emitted [MediaChunk]s are global: they keep increasing across
/// refreshes of a live manifest even though the manifest itself only describes a sliding window.
pub struct SmoothChunkSource {
    config: SmoothSourceConfig,
    catalog: TrackCatalog,
    tracker: LiveWindowTracker,
    data_source: Arc<dyn DataSource>,
    evaluator: Box<dyn FormatEvaluator>,
    evaluation: Evaluation,
    fetcher: Option<Box<dyn ManifestFetcher>>,
    fatal_error: Option<Arc<SmoothError>>,
}

impl SmoothChunkSource {
    /// Source for content whose manifest never changes.
    pub fn new<E>(
        manifest: Arc<SmoothManifest>,
        data_source: Arc<dyn DataSource>,
        evaluator: E,
        config: SmoothSourceConfig,
    ) -> SmoothResult<Self>
    where
        E: FormatEvaluator + 'static,
    {
        let catalog = TrackCatalog::new(
            &manifest,
            config.stream_element_index,
            config.track_indices.as_deref(),
        )?;
        let tracker = LiveWindowTracker::new(manifest, config.stream_element_index)?;

        Ok(Self {
            config,
            catalog,
            tracker,
            data_source,
            evaluator: Box::new(evaluator),
            evaluation: Evaluation::new(),
            fetcher: None,
            fatal_error: None,
        })
    }

    /// Source for live content. Tracks are taken from the manifest the fetcher currently holds.
    pub fn new_live<F, E>(
        fetcher: F,
        data_source: Arc<dyn DataSource>,
        evaluator: E,
        config: SmoothSourceConfig,
    ) -> SmoothResult<Self>
    where
        F: ManifestFetcher + 'static,
        E: FormatEvaluator + 'static,
    {
        let manifest = fetcher.manifest().ok_or(SmoothError::ManifestUnavailable)?;
        let mut source = Self::new(manifest, data_source, evaluator, config)?;
        source.fetcher = Some(Box::new(fetcher));
        Ok(source)
    }

    pub fn track_info(&self) -> &TrackInfo {
        self.catalog.track_info()
    }

    /// Largest selectable video resolution, `None` unless this source provides video.
    pub fn max_video_dimensions(&self) -> Option<(u32, u32)> {
        self.track_info()
            .mime_type
            .starts_with("video")
            .then(|| self.catalog.max_video_dimensions())
    }

    /// Selectable formats, highest bitrate first.
    pub fn formats(&self) -> &[Format] {
        self.catalog.formats()
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    pub fn manifest(&self) -> &Arc<SmoothManifest> {
        self.tracker.manifest()
    }

    /// Difference between global and local chunk indices of the current manifest.
    pub fn chunk_offset(&self) -> u64 {
        self.tracker.chunk_offset()
    }

    pub fn is_manifest_exhausted(&self) -> bool {
        self.tracker.is_exhausted()
    }

    pub fn enable(&mut self) {
        self.fatal_error = None;
        self.evaluator.enable();
        if let Some(fetcher) = self.fetcher.as_mut() {
            fetcher.enable();
        }
    }

    pub fn disable(&mut self, _queue: &[Arc<MediaChunk>]) {
        self.evaluator.disable();
        if let Some(fetcher) = self.fetcher.as_mut() {
            fetcher.disable();
        }
    }

    /// Picks up refreshed live manifests and asks for a new one once the current one is used up.
    pub fn continue_buffering(&mut self, _playback_position_us: i64) {
        if self.fatal_error.is_some() || !self.tracker.manifest().is_live() {
            return;
        }
        let Some(fetcher) = self.fetcher.as_mut() else {
            return;
        };

        if let Some(manifest) = fetcher.manifest() {
            self.tracker.adopt(manifest);
        }

        if self.tracker.should_refresh(
            fetcher.manifest_load_timestamp(),
            Instant::now(),
            self.config.min_manifest_refresh_period(),
        ) {
            tracing::debug!(
                chunk_offset = self.tracker.chunk_offset(),
                "Requesting manifest refresh"
            );
            fetcher.request_refresh();
        }
    }

    /// Writes the next chunk to load into `out`, or clears it when there is nothing to load yet.
    ///
    /// `queue` holds the chunks previously returned by this source that are still buffered or
    /// loading, oldest first. `seek_position_us` is only used when `queue` is empty.
    pub fn get_chunk_operation(
        &mut self,
        queue: &[Arc<MediaChunk>],
        seek_position_us: i64,
        playback_position_us: i64,
        out: &mut ChunkOperation,
    ) -> SmoothResult<()> {
        if self.fatal_error.is_some() {
            out.chunk = None;
            return Ok(());
        }

        self.evaluation.queue_size = queue.len();
        self.evaluator.evaluate(
            queue,
            playback_position_us,
            self.catalog.formats(),
            &mut self.evaluation,
        );
        out.queue_size = self.evaluation.queue_size;

        let Some(format) = self.evaluation.format.clone() else {
            out.chunk = None;
            return Ok(());
        };

        if out.queue_size == queue.len()
            && out
                .chunk
                .as_ref()
                .is_some_and(|chunk| chunk.format == format)
        {
            // The pending request is still what we want
            return Ok(());
        }
        out.chunk = None;

        let chunk_count = self.tracker.element().chunk_count();
        if chunk_count == 0 {
            self.tracker.mark_exhausted();
            return Ok(());
        }

        let is_live = self.tracker.manifest().is_live();
        let retained = &queue[..out.queue_size.min(queue.len())];
        let next_index = match retained.last() {
            None => {
                let seek_position_us = if is_live {
                    live_seek_position_us(
                        self.tracker.manifest(),
                        self.config.live_edge_latency_us(),
                    )
                    .unwrap_or(seek_position_us)
                } else {
                    seek_position_us
                };
                Some(self.tracker.element().chunk_index(seek_position_us) as i64)
            }
            Some(last) if last.is_last_chunk => None,
            Some(last) => {
                Some(last.chunk_index as i64 + 1 - self.tracker.chunk_offset() as i64)
            }
        };

        if is_live {
            if let Some(index) = next_index {
                if index < 0 {
                    tracing::warn!(
                        index,
                        chunk_offset = self.tracker.chunk_offset(),
                        "Requested chunk fell behind the live window"
                    );
                    self.fatal_error = Some(Arc::new(SmoothError::BehindLiveWindow));
                    return Ok(());
                }
                if index >= chunk_count as i64 {
                    self.tracker.mark_exhausted();
                    return Ok(());
                }
                if index == chunk_count as i64 - 1 {
                    self.tracker.mark_exhausted();
                }
            }
        }

        let Some(index) = next_index else {
            // The last queued chunk ends the stream
            return Ok(());
        };
        let local_index = match usize::try_from(index) {
            Ok(local_index) if local_index < chunk_count => local_index,
            _ => {
                tracing::warn!(index, chunk_count, "Chunk index out of range");
                return Ok(());
            }
        };

        let element = self.tracker.element();
        let is_final_index = local_index == chunk_count - 1;
        let start_time_us = element.start_time_us(local_index);
        let end_time_us = (!(is_live && is_final_index))
            .then(|| start_time_us + element.chunk_duration_us(local_index));
        let chunk_index = local_index as u64 + self.tracker.chunk_offset();

        let format_not_found = || SmoothError::FormatNotFound(format.id.clone());
        let track_index = element
            .tracks
            .iter()
            .position(|track| track.format == format)
            .ok_or_else(format_not_found)?;
        let track_context = self
            .catalog
            .track_context(track_index)
            .ok_or_else(format_not_found)?
            .clone();
        let media_format = track_context.media_format.clone();
        let uri = element.build_request_url(track_index, local_index)?;

        tracing::trace!(
            chunk_index,
            start_time_us,
            bitrate = format.bitrate,
            trigger = self.evaluation.trigger.code(),
            "Next chunk: {uri}"
        );
        out.chunk = Some(Arc::new(MediaChunk {
            data_spec: DataSpec::new(uri),
            data_source: self.data_source.clone(),
            format,
            trigger: self.evaluation.trigger,
            start_time_us,
            end_time_us,
            chunk_index,
            is_last_chunk: !is_live && is_final_index,
            sample_offset_us: -start_time_us,
            track_context,
            media_format,
            drm_init_data: self.catalog.drm_init_data().cloned(),
            is_media_format_final: true,
        }));
        Ok(())
    }

    /// Latched error of this source, or the last refresh error of the fetcher.
    pub fn error(&self) -> Option<SourceError> {
        if let Some(error) = &self.fatal_error {
            return Some(SourceError::Fatal(error.clone()));
        }
        self.fetcher
            .as_ref()
            .and_then(|fetcher| fetcher.error())
            .map(SourceError::Fetch)
    }

    pub fn on_chunk_load_completed(&mut self, chunk: &MediaChunk) {
        tracing::trace!(chunk_index = chunk.chunk_index, "Chunk loaded");
    }

    pub fn on_chunk_load_error(&mut self, chunk: &MediaChunk, error: &dyn std::error::Error) {
        tracing::trace!(chunk_index = chunk.chunk_index, "Chunk failed to load: {error}");
    }
}
