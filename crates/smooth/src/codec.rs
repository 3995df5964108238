use crate::{SmoothError, SmoothResult};

const AAC_LC_OBJECT_TYPE: u8 = 2;

/// Sampling frequencies indexed by `samplingFrequencyIndex` (ISO/IEC 14496-3, 1.6.3.4).
const AUDIO_SPECIFIC_CONFIG_SAMPLING_RATE_TABLE: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Channel counts indexed by `channelConfiguration` (ISO/IEC 14496-3, 1.6.3.5).
const AUDIO_SPECIFIC_CONFIG_CHANNEL_COUNT_TABLE: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 8];

/// Builds a two-byte AAC-LC `AudioSpecificConfig`.
///
/// Used for audio quality levels that do not carry `CodecPrivateData`.
pub fn build_aac_audio_specific_config(sample_rate: u32, channels: u32) -> SmoothResult<[u8; 2]> {
    let unsupported = || SmoothError::UnsupportedAudioConfig {
        sample_rate,
        channels,
    };
    let sample_rate_index = AUDIO_SPECIFIC_CONFIG_SAMPLING_RATE_TABLE
        .iter()
        .position(|r| *r == sample_rate)
        .ok_or_else(unsupported)? as u8;
    let channel_config = AUDIO_SPECIFIC_CONFIG_CHANNEL_COUNT_TABLE
        .iter()
        .position(|c| *c == channels)
        .ok_or_else(unsupported)? as u8;

    Ok([
        (AAC_LC_OBJECT_TYPE << 3) | (sample_rate_index >> 1),
        ((sample_rate_index & 0x1) << 7) | (channel_config << 3),
    ])
}
