use mirror_platform::codec::CodecError;
use mirror_platform::{FrameCodec, TileCodec};

/// A "codec" that just prepends a 4-byte `(w: u16, h: u16)` header to the raw
/// RGB bytes, so pipeline tests can exercise the full encode/decode path
/// without linking a real image library.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCodec;

fn encode(rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError> {
    if w > u16::MAX as u32 || h > u16::MAX as u32 {
        return Err(CodecError::EncodeFailed("dimensions exceed u16".into()));
    }
    let mut out = Vec::with_capacity(4 + rgb.len());
    out.extend_from_slice(&(w as u16).to_be_bytes());
    out.extend_from_slice(&(h as u16).to_be_bytes());
    out.extend_from_slice(rgb);
    Ok(out)
}

fn decode(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError> {
    if bytes.len() < 4 {
        return Err(CodecError::DecodeFailed("payload shorter than header".into()));
    }
    let w = u16::from_be_bytes([bytes[0], bytes[1]]) as u32;
    let h = u16::from_be_bytes([bytes[2], bytes[3]]) as u32;
    Ok((bytes[4..].to_vec(), w, h))
}

impl TileCodec for IdentityCodec {
    fn encode(&self, rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError> {
        encode(rgb, w, h)
    }
    fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError> {
        decode(bytes)
    }
}

impl FrameCodec for IdentityCodec {
    fn encode(&self, rgb: &[u8], w: u32, h: u32) -> Result<Vec<u8>, CodecError> {
        encode(rgb, w, h)
    }
    fn decode(&self, bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), CodecError> {
        decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_geometry_and_bytes() {
        let codec = IdentityCodec;
        let rgb = vec![1u8, 2, 3, 4, 5, 6];
        let encoded = TileCodec::encode(&codec, &rgb, 2, 1).unwrap();
        let (decoded, w, h) = TileCodec::decode(&codec, &encoded).unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(decoded, rgb);
    }
}
