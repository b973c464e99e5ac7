//! Geometry payload codec
//!
//! Fetched geometry arrives as an opaque byte payload. The format is a small
//! framed blob:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "WGEO"
//! 4       2     version (u16 LE, currently 1)
//! 6       2     flags (u16 LE, bit 0 = body is LZ4 block compressed)
//! 8       4     stored body length (u32 LE)
//! 12      4     CRC32 of the stored body bytes (u32 LE)
//! 16      ...   body
//! ```
//!
//! The body, after optional decompression, is a vertex count (u32 LE)
//! followed by that many packed little-endian f32 x/y/z triples. A zero
//! vertex count is the explicit "no geometry" answer. The checksum always
//! covers the stored bytes, compressed or not, so corruption is caught
//! before any decompression work.

use glam::Vec3;

use crate::geom::BoundingVolume;

/// Payload file magic.
pub const PAYLOAD_MAGIC: &[u8; 4] = b"WGEO";

/// Current payload format version.
pub const PAYLOAD_VERSION: u16 = 1;

/// Flag bit: body is LZ4 block compressed with a prepended size.
pub const PAYLOAD_FLAG_LZ4: u16 = 1 << 0;

const HEADER_LEN: usize = 16;
const VERTEX_STRIDE: usize = 12;

/// Payload decode failures, surfaced to callers as resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("bad magic, not a geometry payload")]
    BadMagic,

    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u16),

    #[error("payload truncated: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("payload checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("payload decompression failed: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),

    #[error("vertex data truncated: count {count}, body holds {actual} vertices")]
    VertexCountMismatch { count: u32, actual: usize },
}

/// Decode a payload down to its bounding volume.
///
/// Streams the vertex triples through a min/max fold; the full vertex set is
/// never materialized beyond the decompressed body.
pub fn decode_bounds(bytes: &[u8]) -> Result<BoundingVolume, PayloadError> {
    let body = checked_body(bytes)?;

    let decompressed;
    let body = if header_flags(bytes) & PAYLOAD_FLAG_LZ4 != 0 {
        decompressed = lz4_flex::block::decompress_size_prepended(body)?;
        decompressed.as_slice()
    } else {
        body
    };

    if body.len() < 4 {
        return Err(PayloadError::Truncated {
            needed: 4,
            have: body.len(),
        });
    }
    let count = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
    let vertex_bytes = &body[4..];
    let actual = vertex_bytes.len() / VERTEX_STRIDE;
    if actual < count as usize {
        return Err(PayloadError::VertexCountMismatch { count, actual });
    }

    let vertices = vertex_bytes
        .chunks_exact(VERTEX_STRIDE)
        .take(count as usize)
        .map(|v| {
            Vec3::new(
                f32::from_le_bytes([v[0], v[1], v[2], v[3]]),
                f32::from_le_bytes([v[4], v[5], v[6], v[7]]),
                f32::from_le_bytes([v[8], v[9], v[10], v[11]]),
            )
        });
    Ok(BoundingVolume::from_points(vertices))
}

/// Encode vertices into a payload, optionally LZ4 compressed. The inverse of
/// [`decode_bounds`]'s framing; used by providers and fixtures.
pub fn encode_payload(vertices: &[Vec3], compress: bool) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + vertices.len() * VERTEX_STRIDE);
    body.extend_from_slice(&(vertices.len() as u32).to_le_bytes());
    for v in vertices {
        body.extend_from_slice(&v.x.to_le_bytes());
        body.extend_from_slice(&v.y.to_le_bytes());
        body.extend_from_slice(&v.z.to_le_bytes());
    }

    let (flags, stored) = if compress {
        (PAYLOAD_FLAG_LZ4, lz4_flex::block::compress_prepend_size(&body))
    } else {
        (0, body)
    };

    let mut out = Vec::with_capacity(HEADER_LEN + stored.len());
    out.extend_from_slice(PAYLOAD_MAGIC);
    out.extend_from_slice(&PAYLOAD_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&(stored.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc32(&stored).to_le_bytes());
    out.extend_from_slice(&stored);
    out
}

/// Validate framing and checksum, returning the stored body slice.
fn checked_body(bytes: &[u8]) -> Result<&[u8], PayloadError> {
    if bytes.len() < HEADER_LEN {
        return Err(PayloadError::Truncated {
            needed: HEADER_LEN,
            have: bytes.len(),
        });
    }
    if &bytes[0..4] != PAYLOAD_MAGIC {
        return Err(PayloadError::BadMagic);
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != PAYLOAD_VERSION {
        return Err(PayloadError::UnsupportedVersion(version));
    }
    let body_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let stored_crc = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let needed = HEADER_LEN + body_len;
    if bytes.len() < needed {
        return Err(PayloadError::Truncated {
            needed,
            have: bytes.len(),
        });
    }
    let body = &bytes[HEADER_LEN..needed];
    let computed = crc32(body);
    if computed != stored_crc {
        return Err(PayloadError::ChecksumMismatch {
            stored: stored_crc,
            computed,
        });
    }
    Ok(body)
}

fn header_flags(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[6], bytes[7]])
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Aabb;

    fn sample_vertices() -> Vec<Vec3> {
        vec![
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-4.0, 5.0, 0.5),
            Vec3::new(0.0, 0.0, -6.0),
        ]
    }

    fn expected_bounds() -> Aabb {
        Aabb::new(Vec3::new(-4.0, -2.0, -6.0), Vec3::new(1.0, 5.0, 3.0))
    }

    #[test]
    fn test_decode_uncompressed() {
        let payload = encode_payload(&sample_vertices(), false);
        let volume = decode_bounds(&payload).unwrap();
        assert_eq!(volume.aabb(), Some(&expected_bounds()));
    }

    #[test]
    fn test_decode_compressed() {
        let payload = encode_payload(&sample_vertices(), true);
        let volume = decode_bounds(&payload).unwrap();
        assert_eq!(volume.aabb(), Some(&expected_bounds()));
    }

    #[test]
    fn test_zero_vertices_is_no_geometry() {
        let payload = encode_payload(&[], false);
        assert_eq!(decode_bounds(&payload).unwrap(), BoundingVolume::NoGeometry);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut payload = encode_payload(&sample_vertices(), false);
        payload[0] = b'X';
        assert!(matches!(
            decode_bounds(&payload),
            Err(PayloadError::BadMagic)
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut payload = encode_payload(&sample_vertices(), false);
        payload[4] = 9;
        assert!(matches!(
            decode_bounds(&payload),
            Err(PayloadError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_corrupt_body_fails_checksum() {
        let mut payload = encode_payload(&sample_vertices(), false);
        let last = payload.len() - 1;
        payload[last] ^= 0xFF;
        assert!(matches!(
            decode_bounds(&payload),
            Err(PayloadError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let payload = encode_payload(&sample_vertices(), false);
        assert!(matches!(
            decode_bounds(&payload[..10]),
            Err(PayloadError::Truncated { .. })
        ));
        assert!(matches!(
            decode_bounds(&payload[..payload.len() - 4]),
            Err(PayloadError::Truncated { .. })
        ));
    }

    #[test]
    fn test_overdeclared_vertex_count_rejected() {
        // Claim more vertices than the body holds; the checksum still passes
        // because we rebuild the header over the tampered body.
        let mut body = Vec::new();
        body.extend_from_slice(&5u32.to_le_bytes());
        body.extend_from_slice(&[0u8; VERTEX_STRIDE]);
        let mut payload = Vec::new();
        payload.extend_from_slice(PAYLOAD_MAGIC);
        payload.extend_from_slice(&PAYLOAD_VERSION.to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&(body.len() as u32).to_le_bytes());
        payload.extend_from_slice(&crc32(&body).to_le_bytes());
        payload.extend_from_slice(&body);

        assert!(matches!(
            decode_bounds(&payload),
            Err(PayloadError::VertexCountMismatch { count: 5, .. })
        ));
    }
}
