//! Request bodies as handed over by the hosting platform.

use thiserror::Error;

/// Body bytes after any transport decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBody {
    bytes: Vec<u8>,
    was_base64: bool,
}

/// The platform flagged the body as base64 but it did not decode.
#[derive(Debug, Error)]
#[error("request body is not valid base64: {0}")]
pub struct DecodeError(String);

impl RawBody {
    /// Wrap bytes that needed no transport decoding.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            was_base64: false,
        }
    }

    /// Decode a body string as delivered in a proxy event.
    ///
    /// When `is_base64` is set, ASCII whitespace is ignored and the rest
    /// must be standard padded base64. Otherwise the string's UTF-8 bytes are
    /// used unchanged.
    pub fn decode(body: &str, is_base64: bool) -> Result<Self, DecodeError> {
        if !is_base64 {
            return Ok(Self::new(body.as_bytes()));
        }

        let compact: Vec<u8> = body
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let bytes = base64_simd::STANDARD
            .decode_to_vec(&compact)
            .map_err(|e| DecodeError(e.to_string()))?;

        Ok(Self {
            bytes,
            was_base64: true,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn was_base64(&self) -> bool {
        self.was_base64
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
