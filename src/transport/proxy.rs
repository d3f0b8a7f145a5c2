//! Connections to message proxies.
//!
//! A proxy exposes a publish port and a subscribe port. Both sides speak
//! the multipart framing of [`crate::protocol::frame`]:
//!
//! - publish side: `[topic][sender][data]` messages are forwarded to
//!   every subscriber whose prefix matches `topic`;
//! - subscribe side: the client sends `[subscribe][prefix]` and then
//!   receives forwarded `[topic][sender][data]` messages.
//!
//! Only what the connection manager needs is implemented here: connecting,
//! the liveness check, and publishing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpStream;

use crate::domain::{Endpoint, ProxyAddress};
use crate::error::RegistrarError;
use crate::protocol::frame;

/// Command frame that opens a subscription on the subscribe side.
pub const SUBSCRIBE_COMMAND: &str = "subscribe";

/// Topic prefix reserved for control messages.
pub const CONTROL_TOPIC: &str = "__control__";

/// Data frame of a liveness probe.
pub const CHECK_CONNECTION: &str = "checkConnection";

const PROBE_INTERVAL: Duration = Duration::from_millis(100);

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// Publish + subscribe streams to one proxy.
#[derive(Debug)]
pub struct ProxyConnection {
    id: u64,
    identity: String,
    address: ProxyAddress,
    publisher: TcpStream,
    subscriber: TcpStream,
}

impl ProxyConnection {
    /// Opens both streams to the proxy and subscribes the subscribe stream
    /// to this connection's private control topic.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Connection`] if either side cannot be
    /// reached within `connect_timeout`.
    pub async fn connect(
        address: ProxyAddress,
        connect_timeout: Duration,
    ) -> Result<Self, RegistrarError> {
        let publisher = open(&address.pub_endpoint(), connect_timeout).await?;
        let mut subscriber = open(&address.sub_endpoint(), connect_timeout).await?;

        let identity = uuid::Uuid::new_v4().to_string();
        let control = control_topic(&identity);
        frame::write_message(
            &mut subscriber,
            &[
                Bytes::from_static(SUBSCRIBE_COMMAND.as_bytes()),
                Bytes::from(control.into_bytes()),
            ],
        )
        .await
        .map_err(|e| connection_error(&address.sub_endpoint(), e.to_string()))?;

        Ok(Self {
            id: NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed),
            identity,
            address,
            publisher,
            subscriber,
        })
    }

    /// Process-unique identifier of this connection.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Proxy this connection talks to.
    #[must_use]
    pub const fn address(&self) -> &ProxyAddress {
        &self.address
    }

    /// Checks that messages published through the proxy come back to us.
    ///
    /// Publishes a probe on the private control topic every 100 ms until it
    /// is received on the subscribe stream or `window` elapses. Probes sent
    /// before the proxy has processed the subscription are simply lost,
    /// hence the repetition.
    pub async fn check_connection(&mut self, window: Duration) -> bool {
        let probe = [
            Bytes::from(control_topic(&self.identity).into_bytes()),
            Bytes::from(self.identity.clone().into_bytes()),
            Bytes::from_static(CHECK_CONNECTION.as_bytes()),
        ];
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(PROBE_INTERVAL);

        let publisher = &mut self.publisher;
        let subscriber = &mut self.subscriber;
        loop {
            // A started read is never dropped half-way, so the stream stays
            // aligned on message boundaries.
            let read = frame::read_message(&mut *subscriber);
            tokio::pin!(read);
            loop {
                tokio::select! {
                    _ = &mut deadline => return false,
                    _ = ticker.tick() => {
                        if let Err(e) = frame::write_message(&mut *publisher, &probe).await {
                            tracing::warn!(proxy = %self.address, error = %e, "proxy probe could not be sent");
                            return false;
                        }
                    }
                    msg = &mut read => match msg {
                        Ok(Some(frames)) if is_probe_reply(&frames, &self.identity) => return true,
                        Ok(Some(_)) => break,
                        Ok(None) | Err(_) => return false,
                    },
                }
            }
        }
    }

    /// Publishes `data` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Connection`] if the publish stream is broken.
    pub async fn publish(
        &mut self,
        topic: &str,
        sender: &str,
        data: Bytes,
    ) -> Result<(), RegistrarError> {
        let frames = [
            Bytes::from(topic.to_string().into_bytes()),
            Bytes::from(sender.to_string().into_bytes()),
            data,
        ];
        frame::write_message(&mut self.publisher, &frames)
            .await
            .map_err(|e| connection_error(&self.address.pub_endpoint(), e.to_string()))
    }
}

fn control_topic(identity: &str) -> String {
    format!("{CONTROL_TOPIC}:{identity}")
}

fn is_probe_reply(frames: &[Bytes], identity: &str) -> bool {
    matches!(frames, [_, sender, data] if sender == identity && data == CHECK_CONNECTION)
}

async fn open(endpoint: &Endpoint, connect_timeout: Duration) -> Result<TcpStream, RegistrarError> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(endpoint.socket_addr()))
        .await
        .map_err(|_| connection_error(endpoint, "connect timed out"))?
        .map_err(|e| connection_error(endpoint, e.to_string()))?;
    stream
        .set_nodelay(true)
        .map_err(|e| connection_error(endpoint, e.to_string()))?;
    Ok(stream)
}

fn connection_error(endpoint: &Endpoint, reason: impl Into<String>) -> RegistrarError {
    RegistrarError::Connection {
        endpoint: endpoint.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reply_must_match_identity() {
        let frames = [
            Bytes::from_static(b"__control__:me"),
            Bytes::from_static(b"me"),
            Bytes::from_static(CHECK_CONNECTION.as_bytes()),
        ];
        assert!(is_probe_reply(&frames, "me"));
        assert!(!is_probe_reply(&frames, "someone-else"));
        assert!(!is_probe_reply(frames.get(..2).unwrap_or_default(), "me"));
    }

    #[tokio::test]
    async fn unreachable_proxy_is_connection_error() {
        let result =
            ProxyConnection::connect(ProxyAddress::new("127.0.0.1", 1), Duration::from_millis(300))
                .await;
        assert!(matches!(result, Err(RegistrarError::Connection { .. })));
    }
}
