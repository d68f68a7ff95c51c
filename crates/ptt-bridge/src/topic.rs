/// Topic routing for PTT messages.
///
/// Topics are hierarchical: `<namespace>/<channel>/<SEGMENT>`, where the namespace is a
/// fixed prefix such as `/WJI/PTT` and the segment is the routing class of the message
/// kind. Topics are computed at publish time and parsed at receipt time, never stored.
use crate::{frame::Kind, Error, PttResult};

/// Single-level wildcard in subscription patterns.
pub const WILDCARD_SINGLE: &str = "+";
/// Multi-level wildcard, only valid as the final pattern segment.
pub const WILDCARD_MULTI: &str = "#";

/// Routing class for a message kind.
///
/// Text messages and broadcasts both travel on the channel-announce topic; subscribers
/// tell them apart by the frame tag, not the topic. Historical wire behavior, kept for
/// compatibility with existing subscribers.
pub fn segment_for(kind: Kind) -> &'static str {
    match kind {
        Kind::Gps => "GPS",
        Kind::Sos => "SOS",
        Kind::TextMessage | Kind::Broadcast => "CHANNEL_ANNOUNCE",
        Kind::MarkStart | Kind::MarkStop => "MARK",
    }
}

/// Message kinds that can arrive on a given topic segment.
///
/// Unknown segments are an error. The historical tool routed unknown kinds to a
/// catch-all topic, which masks typos; with a closed [`Kind`] set nothing can publish an
/// unknown segment, so the receive side fails fast instead.
pub fn kinds_for_segment(segment: &str) -> PttResult<&'static [Kind]> {
    match segment {
        "GPS" => Ok(&[Kind::Gps]),
        "SOS" => Ok(&[Kind::Sos]),
        "CHANNEL_ANNOUNCE" => Ok(&[Kind::TextMessage, Kind::Broadcast]),
        "MARK" => Ok(&[Kind::MarkStart, Kind::MarkStop]),
        other => Err(Error::UnknownKind(other.to_string())),
    }
}

/// Build the publish topic for a message kind on a channel.
///
/// Refuses an empty channel: a zero-length path segment reads as a wildcard to most
/// brokers and would silently misroute.
pub fn topic_for(namespace: &str, channel: &str, kind: Kind) -> PttResult<String> {
    if channel.is_empty() {
        return Err(Error::EmptyChannel);
    }
    Ok(format!("{}/{}/{}", namespace, channel, segment_for(kind)))
}

/// Catch-all subscription pattern for a namespace.
pub fn catch_all(namespace: &str) -> String {
    format!("{}/{}", namespace, WILDCARD_MULTI)
}

/// Split a received topic into `(channel, segment)`, given the namespace it was
/// subscribed under. `None` when the topic is outside the namespace or not
/// channel/segment shaped.
pub fn parse<'t>(namespace: &str, topic: &'t str) -> Option<(&'t str, &'t str)> {
    let rest = topic.strip_prefix(namespace)?.strip_prefix('/')?;
    let (channel, segment) = rest.split_once('/')?;
    if channel.is_empty() || segment.is_empty() || segment.contains('/') {
        return None;
    }
    Some((channel, segment))
}

/// Match a subscription pattern against a concrete topic, with the two broker wildcard
/// conventions: `+` matches exactly one level, `#` matches any remaining levels.
pub fn matches(pattern: &str, topic: &str) -> bool {
    let mut pat = pattern.split('/');
    let mut top = topic.split('/');
    loop {
        match (pat.next(), top.next()) {
            (Some(WILDCARD_MULTI), _) => return true,
            (Some(WILDCARD_SINGLE), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
