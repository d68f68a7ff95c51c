/// PTT device-telemetry bridge library.
///
/// The *codec* ([`frame`]) encodes and decodes the fixed-header PTT binary frame. The *router*
/// ([`topic`]) maps message kinds to hierarchical broker topics. The [`publisher`] facade and
/// [`inspector`] sit on either side of an abstract pub/sub [`client`], and the [`harness`] drives
/// the facade through a fixed scenario sequence against a live broker.
use std::sync::Once;

use thiserror::Error;

pub mod client;
pub mod frame;
pub mod harness;
pub mod inspector;
pub mod publisher;
pub mod topic;

/// Result type for this library
pub type PttResult<T> = std::result::Result<T, Error>;

/// Error type for this library
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Frame too short: {} bytes, need at least {}", .0, frame::HEADER_LEN)]
    FrameTooShort(usize),
    #[error("Invalid UTF-8 in frame {field} field")]
    InvalidEncoding { field: &'static str },
    #[error("Frame {field} field is {len} bytes, limit is {limit}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },
    #[error("Empty channel name")]
    EmptyChannel,
    #[error("Unknown topic kind segment: {0}")]
    UnknownKind(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Publish rejected: {0}")]
    PublishRejected(String),
}

impl From<nom::error::Error<&[u8]>> for Error {
    fn from(err: nom::error::Error<&[u8]>) -> Self {
        Error::Parse(format!("{:?}", err))
    }
}

/// Test binary helper to init tracing. This is usually the responsibility of the consumer of the
/// library crate.
pub fn lazy_init_tracing() {
    {
        static INIT: Once = Once::new();
        &INIT
    }
    .call_once(|| {
        tracing_subscriber::fmt::init();
    });
}
