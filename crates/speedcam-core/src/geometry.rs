//! Point-envelope decoding for camera geometry payloads.
//!
//! # Layout
//!
//! The payload is base64 text wrapping a binary blob. Only the bounding
//! envelope is read:
//!
//! | offset | size | content                    |
//! |--------|------|----------------------------|
//! | 0      | 6    | header (ignored)           |
//! | 6      | 8    | min-X, little-endian `f64` |
//! | 14     | 8    | max-X, little-endian `f64` |
//! | 22     | 8    | min-Y, little-endian `f64` |
//! | 30     | 8    | max-Y, little-endian `f64` |
//!
//! Anything past byte 38 is ignored. For a point the envelope collapses and
//! its centre is the point itself.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

const ENVELOPE_OFFSET: usize = 6;
const ENVELOPE_LEN: usize = 4 * 8;
/// Minimum payload size in bytes.
pub const MIN_PAYLOAD_LEN: usize = ENVELOPE_OFFSET + ENVELOPE_LEN;

/// Placeholder spellings that mean "no geometry".
const PLACEHOLDERS: &[&str] = &["nan", "none", "null", "nat", "<na>"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("empty geometry payload")]
    Empty,
    #[error("malformed geometry encoding: {0}")]
    Encoding(String),
    #[error("geometry payload too short: {0} bytes, need {MIN_PAYLOAD_LEN}")]
    TooShort(usize),
    #[error("geometry envelope holds a non-finite coordinate")]
    NonFinite,
}

/// Minimal bounding envelope read from a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Centre of the envelope as `(longitude, latitude)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Serialise into the payload layout with a zeroed header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; ENVELOPE_OFFSET];
        for v in [self.min_x, self.max_x, self.min_y, self.max_y] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// Serialise and wrap as base64 text.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }
}

/// Read the envelope out of raw payload bytes.
pub fn envelope_from_bytes(bytes: &[u8]) -> Result<Envelope, GeometryError> {
    if bytes.len() < MIN_PAYLOAD_LEN {
        return Err(GeometryError::TooShort(bytes.len()));
    }
    let mut values = [0f64; 4];
    for (i, v) in values.iter_mut().enumerate() {
        let start = ENVELOPE_OFFSET + i * 8;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[start..start + 8]);
        *v = f64::from_le_bytes(buf);
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::NonFinite);
    }
    let [min_x, max_x, min_y, max_y] = values;
    Ok(Envelope {
        min_x,
        max_x,
        min_y,
        max_y,
    })
}

/// Decode a base64 point-envelope payload into `(longitude, latitude)`.
pub fn decode_point(payload: &str) -> Result<(f64, f64), GeometryError> {
    let text = payload.trim();
    if text.is_empty() || PLACEHOLDERS.contains(&text.to_ascii_lowercase().as_str()) {
        return Err(GeometryError::Empty);
    }
    let bytes = STANDARD
        .decode(text)
        .map_err(|e| GeometryError::Encoding(e.to_string()))?;
    Ok(envelope_from_bytes(&bytes)?.centroid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_recovers_centroid() {
        let env = Envelope {
            min_x: 126.9770,
            max_x: 126.9790,
            min_y: 37.5660,
            max_y: 37.5680,
        };
        let (lon, lat) = decode_point(&env.encode()).unwrap();
        assert!((lon - 126.9780).abs() < 1e-9);
        assert!((lat - 37.5670).abs() < 1e-9);
    }

    #[test]
    fn collapsed_envelope_is_the_point() {
        let env = Envelope {
            min_x: 127.1,
            max_x: 127.1,
            min_y: 36.5,
            max_y: 36.5,
        };
        assert_eq!(decode_point(&env.encode()).unwrap(), (127.1, 36.5));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let env = Envelope {
            min_x: 1.0,
            max_x: 3.0,
            min_y: 2.0,
            max_y: 4.0,
        };
        let mut bytes = env.to_bytes();
        bytes.extend_from_slice(&[0xAB; 21]);
        let (lon, lat) = decode_point(&STANDARD.encode(bytes)).unwrap();
        assert_eq!((lon, lat), (2.0, 3.0));
    }

    #[test]
    fn empty_and_placeholder_payloads() {
        assert_eq!(decode_point(""), Err(GeometryError::Empty));
        assert_eq!(decode_point("   "), Err(GeometryError::Empty));
        assert_eq!(decode_point("NaN"), Err(GeometryError::Empty));
        assert_eq!(decode_point("None"), Err(GeometryError::Empty));
    }

    #[test]
    fn malformed_base64() {
        assert!(matches!(
            decode_point("not*base64!"),
            Err(GeometryError::Encoding(_))
        ));
    }

    #[test]
    fn undersized_payload() {
        let short = STANDARD.encode([0u8; 37]);
        assert_eq!(decode_point(&short), Err(GeometryError::TooShort(37)));
    }

    #[test]
    fn non_finite_envelope() {
        let env = Envelope {
            min_x: f64::NAN,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
        };
        assert_eq!(decode_point(&env.encode()), Err(GeometryError::NonFinite));

        let env = Envelope {
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: f64::INFINITY,
        };
        assert_eq!(decode_point(&env.encode()), Err(GeometryError::NonFinite));
    }
}
