use std::{fmt::Debug, sync::Arc};

use url::Url;

use crate::{
    catalog::{MediaFormat, TrackContext},
    evaluator::Trigger,
    manifest::Format,
    protection::DrmInitData,
};

/// Handle of whatever loads chunk bytes. The chunk source never calls it and only
/// hands it over to the emitted [MediaChunk]s.
pub trait DataSource: Debug + Send + Sync {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: Option<u64>,
}

impl ByteRange {
    pub fn new(offset: u64, length: Option<u64>) -> Self {
        Self { offset, length }
    }

    /// The whole resource.
    pub fn full() -> Self {
        Self::new(0, None)
    }

    pub fn is_full(&self) -> bool {
        self.offset == 0 && self.length.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSpec {
    pub uri: Url,
    pub range: ByteRange,
    pub cache_key: Option<String>,
}

impl DataSpec {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            range: ByteRange::full(),
            cache_key: None,
        }
    }
}

/// A request for one media chunk, ready to be handed to the loader.
#[derive(Debug, Clone)]
pub struct MediaChunk {
    pub data_spec: DataSpec,
    pub data_source: Arc<dyn DataSource>,
    pub format: Format,
    pub trigger: Trigger,
    pub start_time_us: i64,
    /// `None` while the chunk is the still growing end of a live window.
    pub end_time_us: Option<i64>,
    /// Index stable across manifest refreshes.
    pub chunk_index: u64,
    pub is_last_chunk: bool,
    /// Always `-start_time_us`, since Smooth Streaming samples are timestamped relative to
    /// the start of their chunk.
    pub sample_offset_us: i64,
    pub track_context: Arc<TrackContext>,
    pub media_format: Arc<MediaFormat>,
    pub drm_init_data: Option<Arc<DrmInitData>>,
    pub is_media_format_final: bool,
}

impl MediaChunk {
    pub const UNSET_TIME_US: i64 = -1;

    pub fn end_time_us_or_unset(&self) -> i64 {
        self.end_time_us.unwrap_or(Self::UNSET_TIME_US)
    }

    /// Index of the following chunk, `None` at the end of the stream.
    pub fn next_chunk_index(&self) -> Option<u64> {
        (!self.is_last_chunk).then_some(self.chunk_index + 1)
    }
}

/// Output slot of [SmoothChunkSource::get_chunk_operation](crate::SmoothChunkSource::get_chunk_operation).
///
/// The slot is reused across polls: a chunk left in it from a previous poll is kept when
/// the selection did not change.
#[derive(Debug, Default)]
pub struct ChunkOperation {
    /// Number of queued chunks the evaluator wants to keep.
    pub queue_size: usize,
    pub chunk: Option<Arc<MediaChunk>>,
}

impl ChunkOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Option<Arc<MediaChunk>> {
        self.chunk.take()
    }
}
