//! Chunk selection for Smooth Streaming presentations.
//!
//! ```text
//! ┌────────────────────┐  Arc<SmoothManifest>  ┌────────────────────┐
//! │                    ├───────────────────────►                    │
//! │  ManifestFetcher   │                       │ LiveWindowTracker  │
//! │ (live content only)◄───────────────────────┤  local + offset    │
//! │                    │    request_refresh    │                    │
//! └────────────────────┘                       └─────────┬──────────┘
//!                                                        │
//! ┌────────────────────┐        Format         ┌─────────▼──────────┐
//! │                    ├───────────────────────►                    │
//! │  FormatEvaluator   │                       │ SmoothChunkSource  ├───► MediaChunk
//! │                    ◄───────────────────────┤                    │
//! └────────────────────┘  queue, playback pos  └────────────────────┘
//! ```
//!
//! The host drives a [SmoothChunkSource] by calling
//! [continue_buffering](SmoothChunkSource::continue_buffering) and
//! [get_chunk_operation](SmoothChunkSource::get_chunk_operation) on every poll, then loads the
//! emitted [MediaChunk] with its own data source.

pub mod catalog;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod fetcher;
pub mod live;
pub mod manifest;
pub mod protection;
mod source;

pub use catalog::{MediaFormat, TrackCatalog, TrackContext, TrackInfo};
pub use chunk::{ByteRange, ChunkOperation, DataSource, DataSpec, MediaChunk};
pub use config::SmoothSourceConfig;
pub use error::{SmoothError, SmoothResult, SourceError};
pub use evaluator::{Evaluation, FixedEvaluator, FormatEvaluator, Trigger};
pub use fetcher::{manifest_channel, ManifestFetcher, ManifestPublisher, WatchManifestFetcher};
pub use live::LiveWindowTracker;
pub use manifest::{
    Format, ProtectionElement, SmoothManifest, StreamElement, StreamKind, TrackElement,
};
pub use protection::{DrmInitData, TrackEncryption};
pub use source::SmoothChunkSource;
