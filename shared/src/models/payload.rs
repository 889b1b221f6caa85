//! Normalized receipt payload
//!
//! A [`ReceiptPayload`] is the only thing that crosses the wire to an agent.
//! Its `data` is canonical base64 (no data-URL prefix, no whitespace) and is
//! validated by decoding when the payload is built, so a payload that exists
//! is always transmittable as-is and never encoded twice.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Standard alphabet, padding optional on decode (agents and renderers disagree).
pub const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// How the agent must interpret the transmitted bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// Printer-native command bytes (ESC/POS, plain text)
    Raw,
    /// Bitmap image (PNG, JPEG, GIF, BMP, WebP)
    Image,
    /// PDF document
    Pdf,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Raw => "raw",
            PayloadKind::Image => "image",
            PayloadKind::Pdf => "pdf",
        }
    }

    /// Mime type assumed when nothing more specific is known
    pub fn default_mime(&self) -> &'static str {
        match self {
            PayloadKind::Raw => "application/octet-stream",
            PayloadKind::Image => "image/png",
            PayloadKind::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadKind {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(PayloadKind::Raw),
            "image" => Ok(PayloadKind::Image),
            "pdf" => Ok(PayloadKind::Pdf),
            other => Err(PayloadError::UnknownKind(other.to_string())),
        }
    }
}

/// Payload construction / decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("unknown payload type: {0}")]
    UnknownKind(String),

    #[error("payload is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("payload is empty")]
    Empty,
}

/// Type-tagged, validated receipt payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptPayload {
    kind: PayloadKind,
    data: String,
    mime: String,
}

impl ReceiptPayload {
    /// Build from base64 text, validating it decodes to at least one byte.
    ///
    /// ASCII whitespace (line-wrapped base64) is removed; the text is
    /// otherwise kept exactly as given.
    pub fn from_base64(
        kind: PayloadKind,
        data: impl AsRef<str>,
        mime: impl Into<String>,
    ) -> Result<Self, PayloadError> {
        let raw = data.as_ref();
        let data: String = if raw.bytes().any(|b| b.is_ascii_whitespace()) {
            raw.chars().filter(|c| !c.is_ascii_whitespace()).collect()
        } else {
            raw.to_string()
        };

        if data.is_empty() {
            return Err(PayloadError::Empty);
        }
        let decoded = LENIENT_BASE64
            .decode(&data)
            .map_err(|e| PayloadError::InvalidBase64(e.to_string()))?;
        if decoded.is_empty() {
            return Err(PayloadError::Empty);
        }

        Ok(Self {
            kind,
            data,
            mime: mime.into(),
        })
    }

    /// Build from raw bytes (encoded once, here).
    pub fn from_bytes(
        kind: PayloadKind,
        bytes: &[u8],
        mime: impl Into<String>,
    ) -> Result<Self, PayloadError> {
        if bytes.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(Self {
            kind,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime: mime.into(),
        })
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Canonical base64 text, ready for the wire
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Decoded payload bytes
    pub fn decoded(&self) -> Result<Vec<u8>, PayloadError> {
        LENIENT_BASE64
            .decode(&self.data)
            .map_err(|e| PayloadError::InvalidBase64(e.to_string()))
    }
}

/// Classify decoded bytes by their magic signature.
///
/// Returns the payload kind and mime type, or `None` for unrecognized data.
pub fn sniff_bytes(bytes: &[u8]) -> Option<(PayloadKind, &'static str)> {
    const SIGNATURES: &[(&[u8], PayloadKind, &str)] = &[
        (b"\x89PNG\r\n\x1a\n", PayloadKind::Image, "image/png"),
        (b"\xff\xd8\xff", PayloadKind::Image, "image/jpeg"),
        (b"GIF8", PayloadKind::Image, "image/gif"),
        (b"%PDF-", PayloadKind::Pdf, "application/pdf"),
    ];

    for (magic, kind, mime) in SIGNATURES {
        if bytes.starts_with(magic) {
            return Some((*kind, mime));
        }
    }
    // RIFF....WEBP
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some((PayloadKind::Image, "image/webp"));
    }
    if is_bmp(bytes) {
        return Some((PayloadKind::Image, "image/bmp"));
    }
    None
}

/// `BM` alone also starts plain text, so the header fields must be sane too
fn is_bmp(bytes: &[u8]) -> bool {
    const FILE_HEADER: u32 = 14;
    // BITMAPCOREHEADER through BITMAPV5HEADER
    const DIB_SIZES: [u32; 7] = [12, 40, 52, 56, 64, 108, 124];

    let Some(header) = bytes.get(..18) else {
        return false;
    };
    let le = |at: usize| u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]);
    let dib = le(14);

    header.starts_with(b"BM")
        && header[6..10] == [0; 4]
        && DIB_SIZES.contains(&dib)
        && le(2) >= FILE_HEADER + dib
        && le(10) >= FILE_HEADER + dib
}

/// File extension for a mime type (spool file naming)
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}
