//! The wire frame format: one logical [`Frame`] per binary transport message.
//!
//! All multi-byte integers are big-endian. The common prefix is
//! `kind: u8, seq: u32, ts: u64` (13 bytes) — `ts` is carried at its full
//! declared width rather than truncated to 16 bits, resolving the timestamp
//! ambiguity documented in `SPEC_FULL.md` §3/§4.4: a 16-bit millisecond
//! counter wraps every ~65s, which would make the latency probe useless
//! across any session longer than a minute.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::CoreError;

pub const HEADER_SIZE: usize = 1 + 4 + 8;

pub const KIND_EMPTY: u8 = 0x00;
pub const KIND_KEYFRAME: u8 = 0x01;
pub const KIND_DELTA: u8 = 0x02;
pub const KIND_RESYNC: u8 = 0x10;
pub const KIND_INPUT: u8 = 0x20;

/// One changed tile inside a [`Frame::Delta`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub tx: u16,
    pub ty: u16,
    pub tw: u16,
    pub th: u16,
    pub data: Vec<u8>,
}

/// A decoded wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Empty {
        seq: u32,
        ts: u64,
    },
    Keyframe {
        seq: u32,
        ts: u64,
        w: u16,
        h: u16,
        tile: u16,
        payload: Vec<u8>,
    },
    Delta {
        seq: u32,
        ts: u64,
        tiles: Vec<TileRecord>,
    },
    /// Client → server: request a full keyframe.
    Resync { seq: u32, ts: u64 },
    /// Client → server: opaque input event payload, uninterpreted by the core.
    Input { seq: u32, ts: u64, payload: Vec<u8> },
}

impl Frame {
    pub fn seq(&self) -> u32 {
        match self {
            Frame::Empty { seq, .. }
            | Frame::Keyframe { seq, .. }
            | Frame::Delta { seq, .. }
            | Frame::Resync { seq, .. }
            | Frame::Input { seq, .. } => *seq,
        }
    }

    pub fn ts(&self) -> u64 {
        match self {
            Frame::Empty { ts, .. }
            | Frame::Keyframe { ts, .. }
            | Frame::Delta { ts, .. }
            | Frame::Resync { ts, .. }
            | Frame::Input { ts, .. } => *ts,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, Frame::Delta { .. })
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, Frame::Keyframe { .. })
    }

    /// Encode this frame into a freshly allocated buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    /// Encode this frame, appending to an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Frame::Empty { seq, ts } => {
                buf.reserve(HEADER_SIZE);
                buf.put_u8(KIND_EMPTY);
                buf.put_u32(*seq);
                buf.put_u64(*ts);
            }
            Frame::Keyframe {
                seq,
                ts,
                w,
                h,
                tile,
                payload,
            } => {
                buf.reserve(HEADER_SIZE + 2 + 2 + 2 + 4 + payload.len());
                buf.put_u8(KIND_KEYFRAME);
                buf.put_u32(*seq);
                buf.put_u64(*ts);
                buf.put_u16(*w);
                buf.put_u16(*h);
                buf.put_u16(*tile);
                buf.put_u32(payload.len() as u32);
                buf.extend_from_slice(payload);
            }
            Frame::Delta { seq, ts, tiles } => {
                buf.reserve(HEADER_SIZE + 2);
                buf.put_u8(KIND_DELTA);
                buf.put_u32(*seq);
                buf.put_u64(*ts);
                buf.put_u16(tiles.len() as u16);
                for t in tiles {
                    buf.reserve(2 + 2 + 2 + 2 + 4 + t.data.len());
                    buf.put_u16(t.tx);
                    buf.put_u16(t.ty);
                    buf.put_u16(t.tw);
                    buf.put_u16(t.th);
                    buf.put_u32(t.data.len() as u32);
                    buf.extend_from_slice(&t.data);
                }
            }
            Frame::Resync { seq, ts } => {
                buf.reserve(HEADER_SIZE);
                buf.put_u8(KIND_RESYNC);
                buf.put_u32(*seq);
                buf.put_u64(*ts);
            }
            Frame::Input { seq, ts, payload } => {
                buf.reserve(HEADER_SIZE + 2 + payload.len());
                buf.put_u8(KIND_INPUT);
                buf.put_u32(*seq);
                buf.put_u64(*ts);
                buf.put_u16(payload.len() as u16);
                buf.extend_from_slice(payload);
            }
        }
    }

    /// Decode one whole frame from `buf`. `buf` must contain exactly one
    /// message body (the transport already delimits messages) — any
    /// trailing bytes, or a declared length that doesn't consume the body
    /// exactly, is a malformed frame.
    pub fn decode(buf: &[u8]) -> Result<Frame, CoreError> {
        if buf.len() < HEADER_SIZE {
            return Err(CoreError::FrameMalformed(format!(
                "need {} header bytes, have {}",
                HEADER_SIZE,
                buf.len()
            )));
        }

        let mut cursor = buf;
        let kind = cursor.get_u8();
        let seq = cursor.get_u32();
        let ts = cursor.get_u64();

        match kind {
            KIND_EMPTY => {
                if !cursor.is_empty() {
                    return Err(CoreError::FrameMalformed("Empty frame has trailing bytes".into()));
                }
                Ok(Frame::Empty { seq, ts })
            }
            KIND_KEYFRAME => {
                if cursor.len() < 2 + 2 + 2 + 4 {
                    return Err(CoreError::FrameMalformed("Keyframe header truncated".into()));
                }
                let w = cursor.get_u16();
                let h = cursor.get_u16();
                let tile = cursor.get_u16();
                let payload_len = cursor.get_u32() as usize;
                if cursor.len() != payload_len {
                    return Err(CoreError::FrameMalformed(format!(
                        "Keyframe payload_len {} does not match remaining {} bytes",
                        payload_len,
                        cursor.len()
                    )));
                }
                Ok(Frame::Keyframe {
                    seq,
                    ts,
                    w,
                    h,
                    tile,
                    payload: cursor.to_vec(),
                })
            }
            KIND_DELTA => {
                if cursor.len() < 2 {
                    return Err(CoreError::FrameMalformed("Delta header truncated".into()));
                }
                let n = cursor.get_u16() as usize;
                let mut tiles = Vec::with_capacity(n);
                for _ in 0..n {
                    if cursor.len() < 2 + 2 + 2 + 2 + 4 {
                        return Err(CoreError::FrameMalformed("Delta tile record truncated".into()));
                    }
                    let tx = cursor.get_u16();
                    let ty = cursor.get_u16();
                    let tw = cursor.get_u16();
                    let th = cursor.get_u16();
                    let data_len = cursor.get_u32() as usize;
                    if cursor.len() < data_len {
                        return Err(CoreError::FrameMalformed("Delta tile data truncated".into()));
                    }
                    let data = cursor[..data_len].to_vec();
                    cursor.advance(data_len);
                    tiles.push(TileRecord { tx, ty, tw, th, data });
                }
                if !cursor.is_empty() {
                    return Err(CoreError::FrameMalformed("Delta frame has trailing bytes".into()));
                }
                Ok(Frame::Delta { seq, ts, tiles })
            }
            KIND_RESYNC => {
                if !cursor.is_empty() {
                    return Err(CoreError::FrameMalformed("Resync frame has trailing bytes".into()));
                }
                Ok(Frame::Resync { seq, ts })
            }
            KIND_INPUT => {
                if cursor.len() < 2 {
                    return Err(CoreError::FrameMalformed("Input header truncated".into()));
                }
                let payload_len = cursor.get_u16() as usize;
                if cursor.len() != payload_len {
                    return Err(CoreError::FrameMalformed(format!(
                        "Input payload_len {} does not match remaining {} bytes",
                        payload_len,
                        cursor.len()
                    )));
                }
                Ok(Frame::Input {
                    seq,
                    ts,
                    payload: cursor.to_vec(),
                })
            }
            other => Err(CoreError::FrameMalformed(format!(
                "unknown or reserved frame kind 0x{:02x}",
                other
            ))),
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One-way latency estimate for a received frame: wall-clock now minus the
/// timestamp the sender stamped it with. Only meaningful when sender and
/// receiver clocks are reasonably synchronized (both sides of the demo run
/// on the same host); callers own what they do with the number (log it,
/// feed a moving average, whatever `on_latency` would have done).
pub fn latency_ms(frame: &Frame) -> u64 {
    now_millis().saturating_sub(frame.ts())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let f = Frame::Empty { seq: 7, ts: 1234 };
        let encoded = f.encode();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(Frame::decode(&encoded).unwrap(), f);
    }

    #[test]
    fn keyframe_roundtrip() {
        let f = Frame::Keyframe {
            seq: 0,
            ts: 42,
            w: 128,
            h: 64,
            tile: 64,
            payload: vec![1, 2, 3, 4, 5],
        };
        let encoded = f.encode();
        assert_eq!(Frame::decode(&encoded).unwrap(), f);
    }

    #[test]
    fn delta_roundtrip() {
        let f = Frame::Delta {
            seq: 1,
            ts: 99,
            tiles: vec![
                TileRecord { tx: 0, ty: 0, tw: 64, th: 64, data: vec![0xAA; 10] },
                TileRecord { tx: 1, ty: 0, tw: 64, th: 64, data: vec![] },
            ],
        };
        let encoded = f.encode();
        assert_eq!(Frame::decode(&encoded).unwrap(), f);
    }

    #[test]
    fn resync_and_input_roundtrip() {
        let r = Frame::Resync { seq: 3, ts: 5 };
        assert_eq!(Frame::decode(&r.encode()).unwrap(), r);

        let i = Frame::Input { seq: 3, ts: 5, payload: vec![9, 9, 9] };
        assert_eq!(Frame::decode(&i.encode()).unwrap(), i);
    }

    #[test]
    fn rejects_truncated_header() {
        let buf = [0u8; 5];
        assert!(Frame::decode(&buf).is_err());
    }

    #[test]
    fn rejects_declared_length_mismatch() {
        let f = Frame::Keyframe {
            seq: 0,
            ts: 0,
            w: 1,
            h: 1,
            tile: 64,
            payload: vec![1, 2, 3],
        };
        let mut encoded = f.encode();
        encoded.truncate(encoded.len() - 1); // drop last payload byte
        assert!(Frame::decode(&encoded).is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut buf = Frame::Empty { seq: 0, ts: 0 }.encode();
        buf[0] = 0xFF;
        assert!(Frame::decode(&buf).is_err());
    }

    #[test]
    fn big_endian_on_the_wire() {
        let f = Frame::Empty { seq: 0x0102_0304, ts: 0 };
        let encoded = f.encode();
        assert_eq!(&encoded[1..5], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn latency_is_now_minus_timestamp() {
        let past = now_millis().saturating_sub(250);
        let f = Frame::Empty { seq: 0, ts: past };
        let ms = latency_ms(&f);
        assert!(ms >= 250, "expected at least 250ms of latency, got {ms}");
    }

    #[test]
    fn latency_never_underflows_for_future_timestamps() {
        let f = Frame::Empty { seq: 0, ts: now_millis() + 60_000 };
        assert_eq!(latency_ms(&f), 0);
    }
}
