/// PTT binary frame codec.
///
/// One frame carries one message. The header is fixed width and always present:
///
/// | Offset | Length   | Field     | Encoding            |
/// |--------|----------|-----------|---------------------|
/// | 0      | 32       | tag       | UTF-8, null-padded  |
/// | 32     | 128      | sender_id | UTF-8, null-padded  |
/// | 160    | variable | data      | UTF-8, no padding   |
///
/// Total frame length is always `160 + len(data)`. Encoding is lossy by design for
/// compatibility with the historical tool: a tag or sender_id longer than its field is
/// silently truncated at the byte limit. Truncation that lands mid-codepoint produces a
/// field that will not decode as UTF-8; behavior of such frames is undefined beyond
/// "decode reports [`Error::InvalidEncoding`]". Null bytes inside tag or sender_id are
/// ambiguous with padding and are disallowed input for the round-trip guarantee.
use nom::{bytes::complete::take, combinator::rest, Finish, IResult};
use tracing::debug;

use crate::{Error, PttResult};

pub const TAG_LEN: usize = 32;
pub const SENDER_ID_LEN: usize = 128;
pub const HEADER_LEN: usize = TAG_LEN + SENDER_ID_LEN;

/// Semantic message kind. Closed set; the wire tag is the canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Gps,
    Sos,
    TextMessage,
    Broadcast,
    MarkStart,
    MarkStop,
}

impl Kind {
    /// Wire tag string, as placed in the 32-byte tag field.
    pub fn tag(&self) -> &'static str {
        match self {
            Kind::Gps => "GPS",
            Kind::Sos => "SOS",
            Kind::TextMessage => "TEXT_MESSAGE",
            Kind::Broadcast => "BROADCAST",
            Kind::MarkStart => "MARK_START",
            Kind::MarkStop => "MARK_STOP",
        }
    }

    /// Inverse of [`Kind::tag`]. `None` for tags outside the closed set.
    pub fn from_tag(tag: &str) -> Option<Kind> {
        match tag {
            "GPS" => Some(Kind::Gps),
            "SOS" => Some(Kind::Sos),
            "TEXT_MESSAGE" => Some(Kind::TextMessage),
            "BROADCAST" => Some(Kind::Broadcast),
            "MARK_START" => Some(Kind::MarkStart),
            "MARK_STOP" => Some(Kind::MarkStop),
            _ => None,
        }
    }
}

/// Decoded form of one PTT message.
///
/// `tag` is kept as a string rather than a [`Kind`] so that frames carrying tags outside
/// the closed set still decode and stay observable downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub tag: String,
    pub sender_id: String,
    pub data: String,
}

impl Frame {
    pub fn new(kind: Kind, sender_id: &str, data: impl Into<String>) -> Self {
        Self {
            tag: kind.tag().to_string(),
            sender_id: sender_id.to_string(),
            data: data.into(),
        }
    }

    /// Message kind, when the tag is in the closed set.
    pub fn kind(&self) -> Option<Kind> {
        Kind::from_tag(&self.tag)
    }

    /// Encode to wire bytes. Exactly `HEADER_LEN + data.len()` bytes; oversize tag or
    /// sender_id is silently truncated (see module docs).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len());
        push_padded(&mut buf, self.tag.as_bytes(), TAG_LEN);
        push_padded(&mut buf, self.sender_id.as_bytes(), SENDER_ID_LEN);
        buf.extend_from_slice(self.data.as_bytes());
        buf
    }

    /// Strict-mode encode: fails with [`Error::FieldTooLong`] instead of truncating.
    /// Intended for new deployments that prefer an error over silent data loss.
    pub fn encode_strict(&self) -> PttResult<Vec<u8>> {
        check_fits("tag", self.tag.as_bytes(), TAG_LEN)?;
        check_fits("sender_id", self.sender_id.as_bytes(), SENDER_ID_LEN)?;
        Ok(self.encode())
    }

    /// Decode wire bytes.
    ///
    /// Fails with [`Error::FrameTooShort`] below `HEADER_LEN` bytes and with
    /// [`Error::InvalidEncoding`] when any region is not valid UTF-8. Malformed frames
    /// must surface as errors, never as replacement characters.
    pub fn decode(bytes: &[u8]) -> PttResult<Frame> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::FrameTooShort(bytes.len()));
        }
        let (tag, sender_id, data) = nom_split(bytes).finish().map(|(_, f)| f)?;
        let frame = Frame {
            tag: field_str("tag", tag)?,
            sender_id: field_str("sender_id", sender_id)?,
            data: std::str::from_utf8(data)
                .map_err(|_| Error::InvalidEncoding { field: "data" })?
                .to_string(),
        };
        debug!(tag = %frame.tag, sender_id = %frame.sender_id, data_len = frame.data.len(), "decoded frame");
        Ok(frame)
    }
}

fn nom_split(bytes: &[u8]) -> IResult<&[u8], (&[u8], &[u8], &[u8])> {
    let (remaining, tag) = take(TAG_LEN)(bytes)?;
    let (remaining, sender_id) = take(SENDER_ID_LEN)(remaining)?;
    let (remaining, data) = rest(remaining)?;
    Ok((remaining, (tag, sender_id, data)))
}

fn push_padded(buf: &mut Vec<u8>, field: &[u8], width: usize) {
    let used = field.len().min(width);
    buf.extend_from_slice(&field[..used]);
    buf.resize(buf.len() + (width - used), 0);
}

fn check_fits(name: &'static str, field: &[u8], limit: usize) -> PttResult<()> {
    if field.len() > limit {
        return Err(Error::FieldTooLong {
            field: name,
            len: field.len(),
            limit,
        });
    }
    Ok(())
}

/// Decode a fixed-width field: whole region must be valid UTF-8, trailing NULs are padding.
fn field_str(name: &'static str, region: &[u8]) -> PttResult<String> {
    let s = std::str::from_utf8(region).map_err(|_| Error::InvalidEncoding { field: name })?;
    Ok(s.trim_end_matches('\0').to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lazy_init_tracing;

    #[test]
    fn test_sos_frame_layout() {
        lazy_init_tracing();
        let frame = Frame::new(Kind::Sos, "user-001", "25.0338,121.5646");
        let bytes = frame.encode();
        assert_eq!(bytes.len(), 176);
        assert_eq!(&bytes[0..3], b"SOS");
        assert!(bytes[3..32].iter().all(|b| *b == 0));
        assert_eq!(&bytes[32..40], b"user-001");
        assert!(bytes[40..160].iter().all(|b| *b == 0));
        assert_eq!(&bytes[160..], b"25.0338,121.5646");
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            Frame::new(Kind::Gps, "user-001", "user-001,25.0338,121.5646"),
            Frame::new(Kind::TextMessage, "AUTO-TEST-001", "hello channel"),
            Frame::new(Kind::MarkStart, "device-7", ""),
            Frame::new(Kind::Broadcast, "指揮中心", "撤離警報"),
        ];
        for frame in cases {
            let decoded = Frame::decode(&frame.encode()).unwrap();
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn test_tag_truncated_at_32_bytes() {
        let long = "X".repeat(40);
        let frame = Frame {
            tag: long.clone(),
            sender_id: "s".into(),
            data: String::new(),
        };
        let bytes = frame.encode();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..TAG_LEN], long[..32].as_bytes());
        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded.tag, long[..32]);
    }

    #[test]
    fn test_strict_mode_rejects_oversize() {
        let frame = Frame {
            tag: "T".repeat(33),
            sender_id: "s".into(),
            data: String::new(),
        };
        match frame.encode_strict() {
            Err(Error::FieldTooLong { field, len, limit }) => {
                assert_eq!(field, "tag");
                assert_eq!(len, 33);
                assert_eq!(limit, 32);
            }
            other => panic!("expected FieldTooLong, got {:?}", other),
        }
        let ok = Frame::new(Kind::Gps, "user-001", "1,2,3");
        assert_eq!(ok.encode_strict().unwrap(), ok.encode());
    }

    #[test]
    fn test_short_frame_rejected() {
        match Frame::decode(&[0u8; 159]) {
            Err(Error::FrameTooShort(len)) => assert_eq!(len, 159),
            other => panic!("expected FrameTooShort, got {:?}", other),
        }
        // Exactly the header is a valid frame with empty data.
        let decoded = Frame::decode(&[0u8; 160]).unwrap();
        assert_eq!(decoded.tag, "");
        assert_eq!(decoded.sender_id, "");
        assert_eq!(decoded.data, "");
    }

    #[test]
    fn test_invalid_utf8_surfaces_per_region() {
        let mut bytes = Frame::new(Kind::Gps, "user-001", "ok").encode();
        bytes[1] = 0xff;
        match Frame::decode(&bytes) {
            Err(Error::InvalidEncoding { field }) => assert_eq!(field, "tag"),
            other => panic!("expected InvalidEncoding, got {:?}", other),
        }

        let mut bytes = Frame::new(Kind::Gps, "user-001", "ok").encode();
        bytes[33] = 0xff;
        match Frame::decode(&bytes) {
            Err(Error::InvalidEncoding { field }) => assert_eq!(field, "sender_id"),
            other => panic!("expected InvalidEncoding, got {:?}", other),
        }

        let mut bytes = Frame::new(Kind::Gps, "user-001", "ok").encode();
        bytes[161] = 0xff;
        match Frame::decode(&bytes) {
            Err(Error::InvalidEncoding { field }) => assert_eq!(field, "data"),
            other => panic!("expected InvalidEncoding, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_tag_inverse() {
        for kind in [
            Kind::Gps,
            Kind::Sos,
            Kind::TextMessage,
            Kind::Broadcast,
            Kind::MarkStart,
            Kind::MarkStop,
        ] {
            assert_eq!(Kind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(Kind::from_tag("VOICE"), None);
    }
}
