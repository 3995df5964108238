mod base_url;
mod template;

pub use template::ChunkTemplate;

use bytes::Bytes;
use url::Url;
use uuid::Uuid;

use crate::{SmoothError, SmoothResult};

/// Time scale used when a stream element does not declare one.
pub const DEFAULT_TIMESCALE: u64 = 10_000_000;

const MICROS_PER_SECOND: u128 = 1_000_000;

/// An already parsed Smooth Streaming client manifest.
///
/// Snapshots are immutable. A live manifest is refreshed by publishing a new
/// `Arc<SmoothManifest>`, never by mutating an existing one: consumers detect
/// refreshes by comparing the `Arc` pointers.
#[derive(Debug, Clone)]
pub struct SmoothManifest {
    pub is_live: bool,
    /// `None` for live presentations without a known end.
    pub duration_us: Option<i64>,
    pub protection: Option<ProtectionElement>,
    pub stream_elements: Vec<StreamElement>,
}

impl SmoothManifest {
    pub fn new(is_live: bool, duration_us: Option<i64>, stream_elements: Vec<StreamElement>) -> Self {
        Self {
            is_live,
            duration_us,
            protection: None,
            stream_elements,
        }
    }

    pub fn with_protection(mut self, protection: ProtectionElement) -> Self {
        self.protection = Some(protection);
        self
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn element(&self, index: usize) -> SmoothResult<&StreamElement> {
        self.stream_elements
            .get(index)
            .ok_or(SmoothError::StreamElementOutOfRange {
                index,
                count: self.stream_elements.len(),
            })
    }
}

/// `<Protection><ProtectionHeader SystemID="...">base64</ProtectionHeader></Protection>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionElement {
    pub system_id: Uuid,
    /// Decoded protection header, usually a UTF-16 PlayReady object.
    pub data: Bytes,
}

impl ProtectionElement {
    pub fn new(system_id: Uuid, data: impl Into<Bytes>) -> Self {
        Self {
            system_id,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Text,
}

/// One selectable quality level of a stream element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Format {
    pub id: String,
    pub mime_type: String,
    /// Bits per second.
    pub bitrate: u32,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub sample_rate: u32,
    pub codecs: Option<String>,
}

impl Format {
    pub fn video(id: impl Into<String>, mime_type: impl Into<String>, bitrate: u32, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            bitrate,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn audio(
        id: impl Into<String>,
        mime_type: impl Into<String>,
        bitrate: u32,
        channels: u32,
        sample_rate: u32,
    ) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            bitrate,
            channels,
            sample_rate,
            ..Default::default()
        }
    }

    pub fn text(id: impl Into<String>, mime_type: impl Into<String>, bitrate: u32) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            bitrate,
            ..Default::default()
        }
    }

    pub fn with_codecs(mut self, codecs: impl Into<String>) -> Self {
        self.codecs = Some(codecs.into());
        self
    }
}

/// `<QualityLevel>`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackElement {
    pub format: Format,
    /// Codec specific data from `CodecPrivateData`. Empty when the manifest omits it.
    pub csd: Vec<Bytes>,
}

impl TrackElement {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            csd: Vec::new(),
        }
    }

    pub fn with_csd(mut self, csd: impl Into<Bytes>) -> Self {
        self.csd.push(csd.into());
        self
    }
}

/// `<StreamIndex>`: one track family and its chunk timeline.
///
/// Chunks are never materialized. They are addressed by index and described by
/// their start times, with the last chunk carrying an explicit duration.
#[derive(Debug, Clone)]
pub struct StreamElement {
    pub kind: StreamKind,
    pub timescale: u64,
    pub max_width: u32,
    pub max_height: u32,
    pub tracks: Vec<TrackElement>,

    base_url: Url,
    chunk_template: String,

    chunk_start_times: Vec<u64>,
    chunk_start_times_us: Vec<i64>,
    last_chunk_duration_us: i64,
}

impl StreamElement {
    /// `chunk_start_times` and `last_chunk_duration` are expressed in `timescale` units and the
    /// start times must be non-decreasing. A `timescale` of zero falls back to [DEFAULT_TIMESCALE].
    pub fn new(
        kind: StreamKind,
        base_url: Url,
        chunk_template: impl Into<String>,
        timescale: u64,
        tracks: Vec<TrackElement>,
        chunk_start_times: Vec<u64>,
        last_chunk_duration: u64,
    ) -> Self {
        let timescale = if timescale == 0 {
            DEFAULT_TIMESCALE
        } else {
            timescale
        };
        let chunk_start_times_us = chunk_start_times
            .iter()
            .map(|t| scale_to_us(*t, timescale))
            .collect();

        Self {
            kind,
            timescale,
            max_width: 0,
            max_height: 0,
            tracks,
            base_url,
            chunk_template: chunk_template.into(),
            chunk_start_times,
            chunk_start_times_us,
            last_chunk_duration_us: scale_to_us(last_chunk_duration, timescale),
        }
    }

    pub fn with_max_dimensions(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_start_times.len()
    }

    /// Index of the last chunk starting at or before `time_us`.
    ///
    /// Positions before the first chunk map to chunk 0.
    pub fn chunk_index(&self, time_us: i64) -> usize {
        self.chunk_start_times_us
            .partition_point(|start| *start <= time_us)
            .saturating_sub(1)
    }

    /// Panics if `chunk_index` is out of range.
    pub fn start_time_us(&self, chunk_index: usize) -> i64 {
        self.chunk_start_times_us[chunk_index]
    }

    /// Panics if `chunk_index` is out of range.
    pub fn chunk_duration_us(&self, chunk_index: usize) -> i64 {
        if chunk_index == self.chunk_count() - 1 {
            self.last_chunk_duration_us
        } else {
            self.chunk_start_times_us[chunk_index + 1] - self.chunk_start_times_us[chunk_index]
        }
    }

    /// End of the last chunk, the live edge of this element.
    pub fn end_time_us(&self) -> Option<i64> {
        let last = self.chunk_count().checked_sub(1)?;
        Some(self.start_time_us(last) + self.chunk_duration_us(last))
    }

    pub fn build_request_url(&self, track_index: usize, chunk_index: usize) -> SmoothResult<Url> {
        let track = self
            .tracks
            .get(track_index)
            .ok_or(SmoothError::TrackIndexOutOfRange {
                index: track_index,
                count: self.tracks.len(),
            })?;

        let mut template = ChunkTemplate::new();
        template
            .insert(ChunkTemplate::BITRATE, track.format.bitrate.to_string())
            .insert(
                ChunkTemplate::START_TIME,
                self.chunk_start_times[chunk_index].to_string(),
            );
        let chunk_url = template.resolve(&self.chunk_template);

        base_url::merge_chunk_url(&self.base_url, &chunk_url)
    }
}

fn scale_to_us(value: u64, timescale: u64) -> i64 {
    (value as u128 * MICROS_PER_SECOND / timescale as u128) as i64
}
