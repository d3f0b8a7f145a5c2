//! Client side of the registration/discovery protocol.
//!
//! A [`RegistrationDriver`] is one connection to one registrar. It turns a
//! register/remove/find intent into a [`RegRequest`], writes it, and waits
//! a bounded time for the [`RegResponse`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::config::RequestTimeouts;
use crate::domain::{RegistrarAddress, RegistrationEntry, Role, Topic};
use crate::error::RegistrarError;
use crate::protocol::{RegRequest, RegResponse, ReplyStatus, frame};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

const INTERRUPTED: &str = "interrupted while waiting for registrar reply";

/// Connection to a single registrar.
///
/// The TCP stream is opened lazily by the first request; constructing a
/// driver never touches the network. After a timeout or an I/O failure the
/// stream is dropped and the next request reconnects, so a late reply can
/// never be read as the answer to a later request.
#[derive(Debug)]
pub struct RegistrationDriver {
    id: u64,
    address: RegistrarAddress,
    timeouts: RequestTimeouts,
    stream: Option<TcpStream>,
    cancel: watch::Receiver<bool>,
}

impl RegistrationDriver {
    /// Creates a driver for `address`. Does not connect.
    ///
    /// The driver is never cancelled; see [`Self::with_cancellation`].
    #[must_use]
    pub fn new(address: RegistrarAddress, timeouts: RequestTimeouts) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            address,
            timeouts,
            stream: None,
            cancel: never_cancelled(),
        }
    }

    /// Aborts any wait for a reply once `cancel` turns `true`.
    ///
    /// The owner decides what cancels a request (typically its own Ctrl-C
    /// handling); the driver installs no signal handlers.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process-unique identifier of this connection.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Registrar this driver talks to.
    #[must_use]
    pub const fn address(&self) -> &RegistrarAddress {
        &self.address
    }

    /// Returns `true` while a TCP stream is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Registers `entry` as a `role`.
    ///
    /// An incomplete entry (see [`RegistrationEntry::is_complete`]) is
    /// silently ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Registration`] if the registrar rejects the
    /// request or it cannot be sent, and [`RegistrarError::Timeout`] if no
    /// reply arrives within the register timeout.
    pub async fn register(
        &mut self,
        entry: &RegistrationEntry,
        role: Role,
    ) -> Result<(), RegistrarError> {
        if !entry.is_complete() {
            tracing::debug!(name = %entry.name, "skipping register of incomplete entry");
            return Ok(());
        }
        let request = RegRequest::register(entry.clone(), role);
        self.send(&request, self.timeouts.register()).await?;
        Ok(())
    }

    /// Removes the registration of `entry` as a `role`.
    ///
    /// An incomplete entry is silently ignored.
    ///
    /// # Errors
    ///
    /// Same as [`RegistrationDriver::register`].
    pub async fn deregister(
        &mut self,
        entry: &RegistrationEntry,
        role: Role,
    ) -> Result<(), RegistrarError> {
        if !entry.is_complete() {
            tracing::debug!(name = %entry.name, "skipping remove of incomplete entry");
            return Ok(());
        }
        let request = RegRequest::remove(entry.clone(), role);
        self.send(&request, self.timeouts.register()).await?;
        Ok(())
    }

    /// Finds `role` registrations whose topic matches the topic of `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Registration`] if the registrar rejects the
    /// request or it cannot be sent, and [`RegistrarError::Timeout`] if no
    /// reply arrives within the find timeout.
    pub async fn find(
        &mut self,
        query: &RegistrationEntry,
        role: Role,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        self.find_topic(&query.name, query.topic.clone(), role).await
    }

    /// Finds `role` registrations matching `topic` on behalf of `sender`.
    ///
    /// # Errors
    ///
    /// Same as [`RegistrationDriver::find`].
    pub async fn find_topic(
        &mut self,
        sender: &str,
        topic: Topic,
        role: Role,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        let request = RegRequest::find(sender, topic, role);
        self.send(&request, self.timeouts.find()).await
    }

    /// Sends `request` and waits up to `timeout` for the reply.
    ///
    /// Returns the reply data on `SUCCESS`. Cancellation during the wait
    /// aborts the call with a [`RegistrarError::Registration`] and closes
    /// the stream.
    ///
    /// # Errors
    ///
    /// - [`RegistrarError::Registration`] when the connect or write fails,
    ///   the registrar replies with an error status, the reply cannot be
    ///   decoded, or the wait is interrupted.
    /// - [`RegistrarError::Timeout`] when no reply arrives in time.
    pub async fn send(
        &mut self,
        request: &RegRequest,
        timeout: Duration,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        let action = request.action;
        let frames = request.to_frames()?;
        let cancel = self.cancel.clone();
        if *cancel.borrow() {
            return Err(self.registration_error(action.as_str(), INTERRUPTED));
        }

        if let Err(e) = self.write_request(&frames, timeout).await {
            self.stream = None;
            return Err(self.registration_error(action.as_str(), format!("send failed: {e}")));
        }

        let Some(stream) = self.stream.as_mut() else {
            return Err(self.registration_error(action.as_str(), "send failed: not connected"));
        };

        let outcome = tokio::select! {
            reply = tokio::time::timeout(timeout, frame::read_message(stream)) => reply,
            _ = cancelled(cancel) => {
                self.stream = None;
                tracing::debug!(registrar = %self.address, %action, "registrar request interrupted");
                return Err(self.registration_error(action.as_str(), INTERRUPTED));
            }
        };

        let frames = match outcome {
            Ok(Ok(Some(frames))) => frames,
            Ok(Ok(None)) => {
                self.stream = None;
                return Err(
                    self.registration_error(action.as_str(), "registrar closed the connection")
                );
            }
            Ok(Err(e)) => {
                self.stream = None;
                return Err(
                    self.registration_error(action.as_str(), format!("receive failed: {e}"))
                );
            }
            Err(_) => {
                self.stream = None;
                tracing::warn!(registrar = %self.address, %action, ?timeout, "registrar reply timed out");
                return Err(RegistrarError::Timeout {
                    action: action.to_string(),
                    endpoint: self.address.to_string(),
                    timeout,
                });
            }
        };

        let response = RegResponse::from_frames(&frames)
            .map_err(|e| self.registration_error(action.as_str(), e.to_string()))?;
        match response.status {
            ReplyStatus::Success => {
                tracing::debug!(registrar = %self.address, %action, entries = response.data.len(), "registrar request succeeded");
                Ok(response.data)
            }
            ReplyStatus::Error(message) => Err(self.registration_error(action.as_str(), message)),
        }
    }

    async fn write_request(
        &mut self,
        frames: &[bytes::Bytes],
        timeout: Duration,
    ) -> Result<(), RegistrarError> {
        if self.stream.is_none() {
            let addr = self.address.endpoint().socket_addr();
            let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
                .await
                .map_err(|_| {
                    RegistrarError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect to {addr} timed out"),
                    ))
                })??;
            stream.set_nodelay(true)?;
            tracing::debug!(registrar = %self.address, id = self.id, "connected to registrar");
            self.stream = Some(stream);
        }
        match self.stream.as_mut() {
            Some(stream) => frame::write_message(stream, frames).await,
            None => Ok(()),
        }
    }

    fn registration_error(&self, action: &str, message: impl Into<String>) -> RegistrarError {
        RegistrarError::Registration {
            action: action.to_string(),
            endpoint: self.address.to_string(),
            message: message.into(),
        }
    }
}

/// A receiver whose sender is gone; [`cancelled`] never resolves for it.
pub(crate) fn never_cancelled() -> watch::Receiver<bool> {
    watch::channel(false).1
}

/// Resolves once `cancel` holds `true`. Pending forever if the sender is
/// dropped without cancelling.
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
