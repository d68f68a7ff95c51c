/// Publisher facade: one operation per PTT message kind.
///
/// Each operation builds the data payload from typed arguments, encodes a frame with the
/// kind's fixed tag, computes the topic, and hands the bytes to the client at
/// at-least-once delivery. Success means the client accepted the publish for
/// transmission; no remote receipt acknowledgement exists in this protocol. The facade
/// never retries, that belongs to the client.
use tracing::info;

use crate::{
    client::{PubSubClient, QoS},
    frame::{Frame, Kind},
    topic, PttResult,
};

/// Per-operation context: which channel to speak on and as which device.
///
/// The historical tool kept these as process-wide mutable state behind an interactive
/// menu; here callers pass an explicit session to every operation.
#[derive(Debug, Clone)]
pub struct Session {
    pub channel: String,
    pub device_id: String,
}

impl Session {
    pub fn new(channel: &str, device_id: &str) -> Self {
        Self {
            channel: channel.to_string(),
            device_id: device_id.to_string(),
        }
    }
}

/// Facade over a connected [`PubSubClient`] for one topic namespace.
pub struct PttPublisher<C: PubSubClient> {
    client: C,
    namespace: String,
}

impl<C: PubSubClient> PttPublisher<C> {
    pub fn new(client: C, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Position report: data is `<device_id>,<lat>,<lon>`.
    pub fn publish_gps(&mut self, session: &Session, lat: f64, lon: f64) -> PttResult<()> {
        let data = format!(
            "{},{},{}",
            session.device_id,
            fmt_coord(lat),
            fmt_coord(lon)
        );
        self.send(session, Kind::Gps, data)
    }

    /// Distress alert: data is `<lat>,<lon>` only, the sender is in the header.
    pub fn publish_sos(&mut self, session: &Session, lat: f64, lon: f64) -> PttResult<()> {
        let data = format!("{},{}", fmt_coord(lat), fmt_coord(lon));
        self.send(session, Kind::Sos, data)
    }

    /// Free text to one channel. Raw UTF-8, no escaping; callers keep control characters
    /// out of text a downstream consumer might mishandle.
    pub fn publish_text(&mut self, session: &Session, text: &str) -> PttResult<()> {
        self.send(session, Kind::TextMessage, text.to_string())
    }

    /// System-wide announcement, same payload rules as text.
    pub fn publish_broadcast(&mut self, session: &Session, text: &str) -> PttResult<()> {
        self.send(session, Kind::Broadcast, text.to_string())
    }

    /// Recording-mark open. Empty data, the header carries everything.
    pub fn publish_mark_start(&mut self, session: &Session) -> PttResult<()> {
        self.send(session, Kind::MarkStart, String::new())
    }

    /// Recording-mark close.
    pub fn publish_mark_stop(&mut self, session: &Session) -> PttResult<()> {
        self.send(session, Kind::MarkStop, String::new())
    }

    fn send(&mut self, session: &Session, kind: Kind, data: String) -> PttResult<()> {
        let topic = topic::topic_for(&self.namespace, &session.channel, kind)?;
        let frame = Frame::new(kind, &session.device_id, data);
        let bytes = frame.encode();
        self.client.publish(&topic, &bytes, QoS::AtLeastOnce)?;
        info!(topic = %topic, tag = %frame.tag, len = bytes.len(), "published");
        Ok(())
    }
}

/// Fixed decimal coordinate text: at most six fractional digits, trailing zeros
/// trimmed, never scientific notation. Keeps payloads identical across
/// reimplementations.
fn fmt_coord(value: f64) -> String {
    let s = format!("{:.6}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}
