/// Subscriber side of the bridge: decode every inbound frame on a namespace and surface
/// it as a structured event.
///
/// Malformed traffic is a first-class observable here, not something to drop: decode
/// failures become [`InspectorEvent::Malformed`] carrying the leading raw bytes, so a
/// misbehaving publisher shows up in the event stream and the logs.
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{info, warn};

use crate::{
    client::{Handler, PubSubClient},
    frame::Frame,
    topic, PttResult,
};

/// Raw-byte prefix length kept on malformed-frame events.
pub const MALFORMED_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectorEvent {
    Decoded {
        topic: String,
        tag: String,
        sender_id: String,
        data: String,
        received_at: DateTime<Utc>,
    },
    Malformed {
        topic: String,
        error: String,
        prefix: Vec<u8>,
    },
}

/// Catch-all subscriber for one namespace.
pub struct Inspector {
    events: Receiver<InspectorEvent>,
}

impl Inspector {
    /// Subscribe to every topic under `namespace` on an already connected client.
    /// Inbound frames arrive on the returned inspector's event stream.
    pub fn attach<C: PubSubClient>(client: &mut C, namespace: &str) -> PttResult<Self> {
        let (tx, rx) = unbounded();
        let handler = decode_handler(namespace.to_string(), tx);
        client.subscribe(&topic::catch_all(namespace), handler)?;
        Ok(Self { events: rx })
    }

    /// Stream of decoded and malformed message events, in receipt order. Disconnecting
    /// the client ends the stream.
    pub fn events(&self) -> &Receiver<InspectorEvent> {
        &self.events
    }
}

fn decode_handler(namespace: String, tx: Sender<InspectorEvent>) -> Handler {
    Box::new(move |topic, payload| {
        let event = match Frame::decode(payload) {
            Ok(frame) => {
                info!(
                    topic,
                    tag = %frame.tag,
                    sender_id = %frame.sender_id,
                    data = %frame.data,
                    "inbound frame"
                );
                check_routing(&namespace, topic, &frame);
                InspectorEvent::Decoded {
                    topic: topic.to_string(),
                    tag: frame.tag,
                    sender_id: frame.sender_id,
                    data: frame.data,
                    received_at: Utc::now(),
                }
            }
            Err(err) => {
                let prefix = payload[..payload.len().min(MALFORMED_PREFIX_LEN)].to_vec();
                warn!(topic, error = %err, len = payload.len(), "malformed frame");
                InspectorEvent::Malformed {
                    topic: topic.to_string(),
                    error: err.to_string(),
                    prefix,
                }
            }
        };
        // Receiver gone means the inspector was dropped; nothing left to notify.
        let _ = tx.send(event);
    })
}

/// Flag frames whose tag does not belong on the topic they arrived on. A mismatch means
/// a publisher built its topic by hand instead of through the router.
fn check_routing(namespace: &str, received_topic: &str, frame: &Frame) {
    let Some((_, segment)) = topic::parse(namespace, received_topic) else {
        warn!(topic = received_topic, "frame outside channel/segment topic shape");
        return;
    };
    match (frame.kind(), topic::kinds_for_segment(segment)) {
        (Some(kind), Ok(kinds)) if kinds.contains(&kind) => {}
        (Some(_), Ok(_)) | (None, Ok(_)) => {
            warn!(topic = received_topic, tag = %frame.tag, segment, "tag does not match topic segment");
        }
        (_, Err(err)) => {
            warn!(topic = received_topic, error = %err, "unroutable topic segment");
        }
    }
}
