/// Abstract pub/sub client seam.
///
/// The bridge does not implement a broker or its transport; it talks to a client that
/// runs its own background network loop and delivers acks asynchronously. The trait
/// below is the synchronous facade the bridge core needs: every call either waits for
/// the relevant local ack with a bounded timeout or returns an error.
///
/// [`LoopbackClient`] is the in-process stand-in used by tests and demos: a background
/// dispatch thread owns the subscription table and the caller talks to it over bounded
/// channels, same shape as a real networked client.
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::{topic, Error, PttResult};

/// Delivery assurance level for one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    /// The level the bridge always publishes at.
    AtLeastOnce,
}

/// Inbound-message callback. Invoked from the client's own dispatch loop, never from
/// the caller's thread.
pub type Handler = Box<dyn FnMut(&str, &[u8]) + Send>;

/// Contract the bridge core requires from the external pub/sub client.
pub trait PubSubClient {
    /// Establish the connection, waiting at most `timeout` for the broker's ack.
    fn connect(&mut self, timeout: Duration) -> PttResult<()>;

    /// Hand one message to the client for transmission. Success means the client
    /// accepted it locally, not that any subscriber received it.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> PttResult<()>;

    /// Register a handler for every topic matching `pattern`.
    fn subscribe(&mut self, pattern: &str, handler: Handler) -> PttResult<()>;

    /// Release the connection. Idempotent.
    fn disconnect(&mut self);
}

enum Cmd {
    Ping(Sender<()>),
    Subscribe { pattern: String, handler: Handler },
    Publish { topic: String, payload: Vec<u8> },
    Shutdown,
}

/// In-process broker loopback: publishes are dispatched to matching local subscriptions
/// by a background thread.
pub struct LoopbackClient {
    cmds: Option<Sender<Cmd>>,
    dispatcher: Option<JoinHandle<()>>,
    queue_depth: usize,
}

impl LoopbackClient {
    pub fn new() -> Self {
        Self {
            cmds: None,
            dispatcher: None,
            queue_depth: 64,
        }
    }

    fn sender(&self) -> PttResult<&Sender<Cmd>> {
        self.cmds
            .as_ref()
            .ok_or_else(|| Error::PublishRejected("not connected".to_string()))
    }
}

impl Default for LoopbackClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSubClient for LoopbackClient {
    fn connect(&mut self, timeout: Duration) -> PttResult<()> {
        if self.cmds.is_some() {
            return Ok(());
        }
        let (tx, rx) = bounded(self.queue_depth);
        let handle = std::thread::spawn(move || dispatch_loop(rx));

        // Ping/ack handshake stands in for the broker CONNACK.
        let (ack_tx, ack_rx) = bounded(1);
        tx.send(Cmd::Ping(ack_tx))
            .map_err(|_| Error::Connection("dispatcher unavailable".to_string()))?;
        ack_rx
            .recv_timeout(timeout)
            .map_err(|_| Error::Connection(format!("no ack within {:?}", timeout)))?;

        self.cmds = Some(tx);
        self.dispatcher = Some(handle);
        debug!("loopback client connected");
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> PttResult<()> {
        let cmd = Cmd::Publish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };
        debug!(topic, len = payload.len(), ?qos, "queueing publish");
        self.sender()?
            .try_send(cmd)
            .map_err(|_| Error::PublishRejected(format!("queue full or closed: {}", topic)))
    }

    fn subscribe(&mut self, pattern: &str, handler: Handler) -> PttResult<()> {
        let cmd = Cmd::Subscribe {
            pattern: pattern.to_string(),
            handler,
        };
        self.sender()?
            .send(cmd)
            .map_err(|_| Error::Connection("dispatcher gone".to_string()))
    }

    fn disconnect(&mut self) {
        if let Some(tx) = self.cmds.take() {
            // Dispatcher drains queued publishes before it sees the shutdown.
            let _ = tx.send(Cmd::Shutdown);
        }
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
            debug!("loopback client disconnected");
        }
    }
}

impl Drop for LoopbackClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn dispatch_loop(rx: Receiver<Cmd>) {
    let mut subs: Vec<(String, Handler)> = Vec::new();
    for cmd in rx.iter() {
        match cmd {
            Cmd::Ping(ack) => {
                let _ = ack.send(());
            }
            Cmd::Subscribe { pattern, handler } => subs.push((pattern, handler)),
            Cmd::Publish { topic: t, payload } => {
                let mut delivered = 0;
                for (pattern, handler) in subs.iter_mut() {
                    if topic::matches(pattern, &t) {
                        handler(&t, &payload);
                        delivered += 1;
                    }
                }
                if delivered == 0 {
                    warn!(topic = %t, "publish matched no subscription");
                }
            }
            Cmd::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lazy_init_tracing;
    use crossbeam_channel::unbounded;

    const CONNECT_WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_publish_before_connect_rejected() {
        lazy_init_tracing();
        let mut client = LoopbackClient::new();
        match client.publish("/WJI/PTT/test/GPS", b"x", QoS::AtLeastOnce) {
            Err(Error::PublishRejected(_)) => {}
            other => panic!("expected PublishRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_loopback_delivery_by_pattern() {
        lazy_init_tracing();
        let mut client = LoopbackClient::new();
        client.connect(CONNECT_WAIT).unwrap();

        let (tx, rx) = unbounded();
        client
            .subscribe(
                "/WJI/PTT/+/GPS",
                Box::new(move |topic, payload| {
                    tx.send((topic.to_string(), payload.to_vec())).unwrap();
                }),
            )
            .unwrap();

        client
            .publish("/WJI/PTT/test/GPS", b"gps-bytes", QoS::AtLeastOnce)
            .unwrap();
        client
            .publish("/WJI/PTT/test/SOS", b"sos-bytes", QoS::AtLeastOnce)
            .unwrap();
        client.disconnect();

        let (topic, payload) = rx.recv_timeout(CONNECT_WAIT).unwrap();
        assert_eq!(topic, "/WJI/PTT/test/GPS");
        assert_eq!(payload, b"gps-bytes");
        // The SOS publish matched nothing and is not delivered.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut client = LoopbackClient::new();
        client.connect(CONNECT_WAIT).unwrap();
        client.disconnect();
        client.disconnect();
        assert!(client
            .publish("/WJI/PTT/test/GPS", b"x", QoS::AtLeastOnce)
            .is_err());
    }
}
