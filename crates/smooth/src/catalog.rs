use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;

use crate::{
    codec::build_aac_audio_specific_config,
    manifest::{Format, SmoothManifest, StreamElement, StreamKind},
    protection::{DrmInitData, TrackEncryption},
    SmoothError, SmoothResult,
};

/// Length of the NAL unit size prefix in fragmented mp4 video samples.
const VIDEO_NAL_UNIT_LENGTH_FIELD_SIZE: u8 = 4;

/// Decoder configuration for one track.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaFormat {
    Video {
        mime_type: String,
        width: u32,
        height: u32,
        initialization_data: Vec<Bytes>,
        max_width: u32,
        max_height: u32,
    },
    Audio {
        mime_type: String,
        channels: u32,
        sample_rate: u32,
        initialization_data: Vec<Bytes>,
    },
    Text {
        mime_type: String,
    },
}

impl MediaFormat {
    pub fn mime_type(&self) -> &str {
        match self {
            Self::Video { mime_type, .. }
            | Self::Audio { mime_type, .. }
            | Self::Text { mime_type } => mime_type,
        }
    }

    pub fn initialization_data(&self) -> &[Bytes] {
        match self {
            Self::Video {
                initialization_data,
                ..
            }
            | Self::Audio {
                initialization_data,
                ..
            } => initialization_data,
            Self::Text { .. } => &[],
        }
    }

    fn from_element(element: &StreamElement, track_index: usize) -> SmoothResult<Self> {
        let track = &element.tracks[track_index];
        let format = &track.format;

        Ok(match element.kind {
            StreamKind::Video => Self::Video {
                mime_type: format.mime_type.clone(),
                width: format.width,
                height: format.height,
                initialization_data: track.csd.clone(),
                max_width: element.max_width,
                max_height: element.max_height,
            },
            StreamKind::Audio => {
                let initialization_data = if track.csd.is_empty() {
                    let config =
                        build_aac_audio_specific_config(format.sample_rate, format.channels)?;
                    vec![Bytes::copy_from_slice(&config)]
                } else {
                    track.csd.clone()
                };
                Self::Audio {
                    mime_type: format.mime_type.clone(),
                    channels: format.channels,
                    sample_rate: format.sample_rate,
                    initialization_data,
                }
            }
            StreamKind::Text => Self::Text {
                mime_type: format.mime_type.clone(),
            },
        })
    }
}

/// Everything a fragmented mp4 extractor needs to demux chunks of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackContext {
    pub track_index: usize,
    pub kind: StreamKind,
    pub timescale: u64,
    pub duration_us: Option<i64>,
    pub media_format: Arc<MediaFormat>,
    pub encryption: Option<Arc<TrackEncryption>>,
    /// Only set for video tracks.
    pub nal_unit_length_field_size: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub mime_type: String,
    pub duration_us: Option<i64>,
}

#[derive(Debug)]
struct CatalogTrack {
    media_format: Arc<MediaFormat>,
    context: Arc<TrackContext>,
}

/// Selectable quality levels of one stream element, derived once from the initial manifest.
#[derive(Debug)]
pub struct TrackCatalog {
    /// Sorted by decreasing bitrate.
    formats: Vec<Format>,
    tracks: BTreeMap<usize, CatalogTrack>,
    drm_init_data: Option<Arc<DrmInitData>>,
    max_width: u32,
    max_height: u32,
    track_info: TrackInfo,
}

impl TrackCatalog {
    /// Builds the catalog for `element_index`. When `track_indices` is `None`, every track of
    /// the element is selectable.
    pub fn new(
        manifest: &SmoothManifest,
        element_index: usize,
        track_indices: Option<&[usize]>,
    ) -> SmoothResult<Self> {
        let element = manifest.element(element_index)?;
        let first_track = element
            .tracks
            .first()
            .ok_or(SmoothError::NoTracks(element_index))?;
        let track_info = TrackInfo {
            mime_type: first_track.format.mime_type.clone(),
            duration_us: manifest.duration_us,
        };

        let (encryption, drm_init_data) = match &manifest.protection {
            Some(protection) => (
                Some(Arc::new(TrackEncryption::from_protection(protection)?)),
                Some(Arc::new(DrmInitData::from(protection))),
            ),
            None => (None, None),
        };

        let track_indices: Vec<usize> = match track_indices {
            Some(indices) => indices.to_vec(),
            None => (0..element.tracks.len()).collect(),
        };
        if track_indices.is_empty() {
            return Err(SmoothError::NoTracks(element_index));
        }

        let mut formats = Vec::with_capacity(track_indices.len());
        let mut tracks = BTreeMap::new();
        let mut max_width = 0;
        let mut max_height = 0;
        for track_index in track_indices {
            let track =
                element
                    .tracks
                    .get(track_index)
                    .ok_or(SmoothError::TrackIndexOutOfRange {
                        index: track_index,
                        count: element.tracks.len(),
                    })?;
            if element.kind == StreamKind::Video {
                max_width = max_width.max(track.format.width);
                max_height = max_height.max(track.format.height);
            }
            formats.push(track.format.clone());

            let media_format = Arc::new(MediaFormat::from_element(element, track_index)?);
            let context = Arc::new(TrackContext {
                track_index,
                kind: element.kind,
                timescale: element.timescale,
                duration_us: manifest.duration_us,
                media_format: media_format.clone(),
                encryption: encryption.clone(),
                nal_unit_length_field_size: (element.kind == StreamKind::Video)
                    .then_some(VIDEO_NAL_UNIT_LENGTH_FIELD_SIZE),
            });
            tracks.insert(
                track_index,
                CatalogTrack {
                    media_format,
                    context,
                },
            );
        }
        formats.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));

        tracing::debug!(
            element_index,
            tracks = formats.len(),
            max_width,
            max_height,
            encrypted = encryption.is_some(),
            "Track catalog built"
        );

        Ok(Self {
            formats,
            tracks,
            drm_init_data,
            max_width,
            max_height,
            track_info,
        })
    }

    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    pub fn media_format(&self, track_index: usize) -> Option<&Arc<MediaFormat>> {
        self.tracks.get(&track_index).map(|t| &t.media_format)
    }

    pub fn track_context(&self, track_index: usize) -> Option<&Arc<TrackContext>> {
        self.tracks.get(&track_index).map(|t| &t.context)
    }

    pub fn drm_init_data(&self) -> Option<&Arc<DrmInitData>> {
        self.drm_init_data.as_ref()
    }

    /// Largest width and height among the selected video tracks, `(0, 0)` for other kinds.
    pub fn max_video_dimensions(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }

    pub fn track_info(&self) -> &TrackInfo {
        &self.track_info
    }
}
