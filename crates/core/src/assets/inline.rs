//! Parsing of inline `data:` media payloads.

use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use regex::Regex;

use super::validate::{validate_asset_size, ValidationError};

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(image/[a-zA-Z0-9.+-]+);base64,(.+)$").expect("data url pattern is valid")
});

/// Standard alphabet, padding optional.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Media types accepted for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }
}

/// A decoded inline payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAsset {
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

/// Whether `value` looks like an extractable inline payload (syntax and
/// allow-listed media type; the payload itself is not decoded).
pub fn is_pending(value: &str) -> bool {
    DATA_URL
        .captures(value)
        .is_some_and(|caps| MediaType::from_mime(&caps[1]).is_some())
}

/// Decode `value` if it is an allow-listed inline payload.
///
/// `Ok(None)` means the value is not a pending asset at all (a path, a URL,
/// an unsupported media type) and must be left untouched. `location` names
/// the field for error messages.
pub fn parse_inline(
    value: &str,
    location: &str,
    max_bytes: usize,
) -> Result<Option<InlineAsset>, ValidationError> {
    let Some(caps) = DATA_URL.captures(value) else {
        return Ok(None);
    };
    let Some(media_type) = MediaType::from_mime(&caps[1]) else {
        return Ok(None);
    };
    let payload = &caps[2];

    // Rejects huge payloads before paying for the decode.
    validate_asset_size(location, decoded_len(payload), max_bytes)?;

    let bytes = LENIENT
        .decode(payload)
        .map_err(|e| ValidationError::MalformedPayload {
            location: location.to_string(),
            mime: media_type.mime().to_string(),
            reason: e.to_string(),
        })?;
    validate_asset_size(location, bytes.len(), max_bytes)?;

    Ok(Some(InlineAsset { media_type, bytes }))
}

/// Decoded size of a well-formed base64 payload, padded or not.
fn decoded_len(payload: &str) -> usize {
    payload.trim_end_matches('=').len() * 3 / 4
}
