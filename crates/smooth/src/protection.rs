use std::{collections::BTreeMap, sync::LazyLock};

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use bytes::Bytes;
use uuid::Uuid;

use crate::{manifest::ProtectionElement, SmoothError, SmoothResult};

/// Smooth Streaming content is always encrypted with 8-byte initialization vectors.
pub const INITIALIZATION_VECTOR_SIZE: usize = 8;

const KID_START: &str = "<KID>";
const KID_END: &str = "</KID>";

static ENGINE: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    GeneralPurpose::new(
        &base64::alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_encode_padding(true)
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    )
});

/// Extracts the key id from a PlayReady protection header.
///
/// The header is UTF-16 XML carrying `<KID>base64</KID>`. The decoded value is a
/// little-endian GUID, which is converted to the big-endian key id used by the
/// `tenc` box.
pub fn extract_key_id(data: &[u8]) -> SmoothResult<[u8; 16]> {
    // The XML is plain ASCII, so the low byte of every UTF-16 code unit is enough.
    let header: String = data.iter().step_by(2).map(|b| *b as char).collect();

    let start = header
        .find(KID_START)
        .ok_or_else(|| SmoothError::InvalidProtectionData(format!("missing {KID_START}")))?
        + KID_START.len();
    let length = header[start..]
        .find(KID_END)
        .ok_or_else(|| SmoothError::InvalidProtectionData(format!("missing {KID_END}")))?;

    let decoded = ENGINE.decode(header[start..start + length].trim())?;
    let mut key_id: [u8; 16] = decoded.try_into().map_err(|v: Vec<u8>| {
        SmoothError::InvalidProtectionData(format!("key id must be 16 bytes, got {}", v.len()))
    })?;

    key_id.swap(0, 3);
    key_id.swap(1, 2);
    key_id.swap(4, 5);
    key_id.swap(6, 7);
    Ok(key_id)
}

/// Default sample encryption parameters, as found in a `tenc` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEncryption {
    pub is_encrypted: bool,
    pub initialization_vector_size: usize,
    pub key_id: [u8; 16],
}

impl TrackEncryption {
    pub fn from_protection(protection: &ProtectionElement) -> SmoothResult<Self> {
        Ok(Self {
            is_encrypted: true,
            initialization_vector_size: INITIALIZATION_VECTOR_SIZE,
            key_id: extract_key_id(&protection.data)?,
        })
    }

    /// Key id in the `<kid>` form expected by `mp4decrypt` and `shaka-packager`.
    pub fn key_id_hex(&self) -> String {
        hex::encode(self.key_id)
    }
}

/// Protection system specific initialization data, keyed by system id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrmInitData {
    pub mime_type: String,
    data: BTreeMap<Uuid, Bytes>,
}

impl DrmInitData {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn put(&mut self, system_id: Uuid, data: Bytes) {
        self.data.insert(system_id, data);
    }

    pub fn get(&self, system_id: &Uuid) -> Option<&Bytes> {
        self.data.get(system_id)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<&ProtectionElement> for DrmInitData {
    fn from(protection: &ProtectionElement) -> Self {
        let mut init_data = Self::new("video/mp4");
        init_data.put(protection.system_id, protection.data.clone());
        init_data
    }
}
