//! Registrar service: answers register/remove/find requests.
//!
//! Accepted TCP connections each get a reader task. Readers forward decoded
//! frames to a single dispatch loop over an mpsc channel and wait for the
//! reply on a oneshot, so the service processes exactly one request at a
//! time (`LISTENING -> PROCESSING -> LISTENING`).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use crate::domain::RegistrationStore;
use crate::error::RegistrarError;
use crate::protocol::{Action, RegRequest, RegResponse, RequestPayload, frame};

const DISPATCH_QUEUE: usize = 256;

type Job = (Vec<Bytes>, oneshot::Sender<RegResponse>);

/// Registrar bound to its listening address.
#[derive(Debug)]
pub struct RegistrarService {
    listener: TcpListener,
    store: Arc<RegistrationStore>,
    next_session_id: AtomicU64,
}

impl RegistrarService {
    /// Binds the registrar to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Io`] if the address cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<RegistrationStore>,
    ) -> Result<Self, RegistrarError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "registrar listening");
        Ok(Self {
            listener,
            store,
            next_session_id: AtomicU64::new(1),
        })
    }

    /// Address actually bound (useful after binding port 0).
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Io`] if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, RegistrarError> {
        Ok(self.listener.local_addr()?)
    }

    /// Store this registrar serves.
    #[must_use]
    pub fn store(&self) -> &Arc<RegistrationStore> {
        &self.store
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Currently never returns an error; accept failures are logged and the
    /// loop continues.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), RegistrarError>
    where
        F: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::channel::<Job>(DISPATCH_QUEUE);

        tokio::select! {
            _ = shutdown => {
                tracing::info!("registrar shutdown signal received");
            }
            _ = self.accept_loop(tx) => {}
            _ = dispatch_loop(Arc::clone(&self.store), rx) => {}
        }
        Ok(())
    }

    async fn accept_loop(&self, tx: mpsc::Sender<Job>) {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr, tx.clone());
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept registrar connection");
                }
            }
        }
    }

    fn handle_connection(
        &self,
        mut socket: TcpStream,
        peer_addr: SocketAddr,
        tx: mpsc::Sender<Job>,
    ) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session_id, peer = %peer_addr, "registrar client connected");
        if let Err(e) = socket.set_nodelay(true) {
            tracing::debug!(session_id, error = %e, "failed to set TCP_NODELAY");
        }

        tokio::spawn(async move {
            loop {
                let frames = match frame::read_message(&mut socket).await {
                    Ok(Some(frames)) => frames,
                    Ok(None) => break,
                    Err(e @ RegistrarError::Protocol(_)) => {
                        tracing::warn!(session_id, error = %e, "malformed registrar frame, closing");
                        if let Ok(reply) = RegResponse::error(e.to_string()).to_frames() {
                            let _ = frame::write_message(&mut socket, &reply).await;
                        }
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(session_id, error = %e, "dropping registrar client");
                        break;
                    }
                };

                let (reply_tx, reply_rx) = oneshot::channel();
                if tx.send((frames, reply_tx)).await.is_err() {
                    break;
                }
                let Ok(response) = reply_rx.await else {
                    break;
                };

                let reply = match response.to_frames() {
                    Ok(frames) => frames,
                    Err(e) => match RegResponse::error(e.to_string()).to_frames() {
                        Ok(frames) => frames,
                        Err(_) => break,
                    },
                };
                if let Err(e) = frame::write_message(&mut socket, &reply).await {
                    tracing::debug!(session_id, error = %e, "failed to write registrar reply");
                    break;
                }
            }
            tracing::debug!(session_id, "registrar client disconnected");
        });
    }
}

async fn dispatch_loop(store: Arc<RegistrationStore>, mut rx: mpsc::Receiver<Job>) {
    while let Some((frames, reply_tx)) = rx.recv().await {
        let response = handle_frames(&store, &frames).await;
        let _ = reply_tx.send(response);
    }
}

/// Decodes `frames` and dispatches the request. Malformed input becomes an
/// error reply.
pub async fn handle_frames(store: &RegistrationStore, frames: &[Bytes]) -> RegResponse {
    match RegRequest::from_frames(frames) {
        Ok(request) => handle_request(store, request).await,
        Err(e) => {
            tracing::warn!(error = %e, "malformed registrar request");
            RegResponse::error(e.to_string())
        }
    }
}

/// Applies one request to `store` and builds the reply. Never fails.
pub async fn handle_request(store: &RegistrationStore, request: RegRequest) -> RegResponse {
    let RegRequest {
        action,
        sender,
        payload,
    } = request;
    tracing::debug!(%action, %sender, "registrar request");

    match (action, payload) {
        (Action::Register(role), RequestPayload::Entry(mut entry)) => {
            if !entry.is_complete() {
                return RegResponse::error(format!(
                    "{action}: registration entry from '{sender}' is incomplete"
                ));
            }
            entry.role = role;
            store.add(entry).await;
            RegResponse::success()
        }
        (Action::Remove(role), RequestPayload::Entry(mut entry)) => {
            entry.role = role;
            store.remove(&entry).await;
            RegResponse::success()
        }
        (Action::Find(role), RequestPayload::Query(topic)) => {
            RegResponse::with_data(store.find(role, &topic).await)
        }
        (action, _) => RegResponse::error(format!("{action}: unexpected payload from '{sender}'")),
    }
}
