//! Polyline representation for route geometries.
//!
//! The provider ships geometries in the compact encoded-polyline format:
//! per-point latitude/longitude deltas at 1e-5 degree fixed point, each
//! folded with zigzag sign encoding and written as 5-bit varint chunks
//! offset by 63. Decoding happens once at the provider boundary; everything
//! downstream works on [`Coordinate`] sequences.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::DecodeError;

const SCALE: f64 = 1e5;
const CHUNK_OFFSET: u8 = 63;
const CONTINUATION: u64 = 0x20;
const CHUNK_MASK: u64 = 0x1f;

/// A polyline representing a route geometry as decoded coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// Parses an encoded polyline string.
    pub fn decode(encoded: &str) -> Result<Self, DecodeError> {
        decode(encoded).map(Self::new)
    }

    /// Encodes the points back into the compact string form.
    pub fn encode(&self) -> String {
        encode(&self.points)
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }
}

/// Decodes an encoded polyline into coordinates.
///
/// Fails if the string ends inside a varint, or if it ends after a latitude
/// delta with no longitude delta to pair it with.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut coords = Vec::with_capacity(bytes.len() / 4);
    let mut lat = 0i64;
    let mut lng = 0i64;
    let mut offset = 0;

    while offset < bytes.len() {
        lat += read_value(bytes, &mut offset)?;
        if offset >= bytes.len() {
            return Err(DecodeError::Truncated { offset });
        }
        lng += read_value(bytes, &mut offset)?;

        coords.push(Coordinate::new(lat as f64 / SCALE, lng as f64 / SCALE));
    }

    Ok(coords)
}

/// Encodes coordinates; the exact inverse of [`decode`] up to 1e-5 degrees.
pub fn encode(coords: &[Coordinate]) -> String {
    let mut output = String::with_capacity(coords.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for coord in coords {
        let lat = (coord.lat * SCALE).round() as i64;
        let lng = (coord.lng * SCALE).round() as i64;

        write_value(lat - prev_lat, &mut output);
        write_value(lng - prev_lng, &mut output);

        prev_lat = lat;
        prev_lng = lng;
    }

    output
}

fn read_value(bytes: &[u8], offset: &mut usize) -> Result<i64, DecodeError> {
    let start = *offset;
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*offset) else {
            return Err(DecodeError::Truncated { offset: *offset });
        };
        if !(CHUNK_OFFSET..=126).contains(&byte) {
            return Err(DecodeError::InvalidByte {
                offset: *offset,
                byte,
            });
        }
        let chunk = u64::from(byte - CHUNK_OFFSET);
        let bits = chunk & CHUNK_MASK;
        // Only four payload bits remain above bit 60.
        if shift >= 64 || (shift == 60 && bits > 0xF) {
            return Err(DecodeError::Overflow { offset: start });
        }
        *offset += 1;

        result |= bits << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    // Zigzag: the low bit carries the sign.
    let value = if result & 1 != 0 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };
    Ok(value)
}

fn write_value(value: i64, output: &mut String) {
    let mut folded = if value < 0 {
        !((value as u64) << 1)
    } else {
        (value as u64) << 1
    };

    while folded >= CONTINUATION {
        output.push(char::from(((folded & CHUNK_MASK) | CONTINUATION) as u8 + CHUNK_OFFSET));
        folded >>= 5;
    }
    output.push(char::from(folded as u8 + CHUNK_OFFSET));
}
