use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmoothError {
    #[error("Stream element {index} not found, manifest has {count} elements")]
    StreamElementOutOfRange { index: usize, count: usize },

    #[error("Track {index} not found, stream element has {count} tracks")]
    TrackIndexOutOfRange { index: usize, count: usize },

    #[error("No track available in stream element {0}")]
    NoTracks(usize),

    #[error("Invalid protection data: {0}")]
    InvalidProtectionData(String),

    #[error("Unsupported AAC audio config: {sample_rate}Hz, {channels} channels")]
    UnsupportedAudioConfig { sample_rate: u32, channels: u32 },

    #[error("Invalid format: {0}")]
    FormatNotFound(String),

    #[error("Manifest fetcher has not loaded any manifest yet")]
    ManifestUnavailable,

    #[error("Requested chunk is behind the live window")]
    BehindLiveWindow,

    #[error("Manifest fetch error: {0}")]
    ManifestFetchError(String),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    Base64DecodeError(#[from] base64::DecodeError),
}

pub type SmoothResult<T> = Result<T, SmoothError>;

/// Error reported by [`SmoothChunkSource::error`](crate::SmoothChunkSource::error).
///
/// A latched fatal error always takes precedence over the fetcher's error.
#[derive(Debug, Clone)]
pub enum SourceError {
    /// Sticky error raised by the chunk source itself. Cleared by `enable`.
    Fatal(Arc<SmoothError>),
    /// Error owned by the manifest fetcher, e.g. a failed refresh.
    Fetch(Arc<SmoothError>),
}

impl SourceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn inner(&self) -> &SmoothError {
        match self {
            Self::Fatal(e) | Self::Fetch(e) => e,
        }
    }
}
