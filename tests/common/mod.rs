//! Loopback servers shared by the integration tests.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};

use topic_registrar::client::DiscoveryService;
use topic_registrar::config::RequestTimeouts;
use topic_registrar::domain::{
    Endpoint, ProxyAddress, RegistrarAddress, RegistrationEntry, RegistrationStore, Role, Topic,
};
use topic_registrar::protocol::{RegResponse, frame};
use topic_registrar::service::RegistrarService;
use topic_registrar::transport::ConnectionManager;

/// A real registrar on an ephemeral loopback port.
pub struct TestRegistrar {
    /// Address clients should use.
    pub address: RegistrarAddress,
    /// Store behind the registrar.
    pub store: Arc<RegistrationStore>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestRegistrar {
    /// Binds and starts serving.
    pub async fn start() -> Self {
        let store = Arc::new(RegistrationStore::new());
        let Ok(service) = RegistrarService::bind(loopback(0), Arc::clone(&store)).await else {
            panic!("bind registrar");
        };
        let Ok(local) = service.local_addr() else {
            panic!("registrar local addr");
        };
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(service.run_until(async move {
            let _ = rx.await;
        }));
        Self {
            address: RegistrarAddress::new("127.0.0.1", local.port()),
            store,
            shutdown: Some(tx),
        }
    }

    /// Stops the registrar.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestRegistrar {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Registrar stub that never answers on its first `silent` connections and
/// answers `SUCCESS` with no data afterwards.
pub async fn spawn_stub_registrar(silent: usize) -> RegistrarAddress {
    let Ok(listener) = TcpListener::bind(loopback(0)).await else {
        panic!("bind stub registrar");
    };
    let Ok(local) = listener.local_addr() else {
        panic!("stub local addr");
    };
    let accepted = Arc::new(AtomicUsize::new(0));
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let nth = accepted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                while let Ok(Some(_request)) = frame::read_message(&mut socket).await {
                    if nth < silent {
                        continue;
                    }
                    let Ok(reply) = RegResponse::success().to_frames() else {
                        return;
                    };
                    if frame::write_message(&mut socket, &reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    RegistrarAddress::new("127.0.0.1", local.port())
}

/// Binds two listeners on adjacent ports `p` and `p + 1`.
async fn bind_adjacent() -> (TcpListener, TcpListener) {
    for _ in 0..100 {
        let Ok(first) = TcpListener::bind(loopback(0)).await else {
            continue;
        };
        let Ok(addr) = first.local_addr() else {
            continue;
        };
        let Some(next) = addr.port().checked_add(1) else {
            continue;
        };
        if let Ok(second) = TcpListener::bind(loopback(next)).await {
            return (first, second);
        }
    }
    panic!("no adjacent loopback ports available");
}

/// Proxy stub that forwards every published message to every subscriber
/// whose prefix matches the topic. When `forward` is `false` published
/// messages are swallowed.
pub async fn spawn_proxy(forward: bool) -> ProxyAddress {
    let (pub_listener, sub_listener) = bind_adjacent().await;
    let Ok(pub_addr) = pub_listener.local_addr() else {
        panic!("proxy local addr");
    };
    let (tx, _) = broadcast::channel::<Vec<Bytes>>(256);

    let publish_tx = tx.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = pub_listener.accept().await {
            let publish_tx = publish_tx.clone();
            tokio::spawn(async move {
                while let Ok(Some(message)) = frame::read_message(&mut socket).await {
                    if forward {
                        let _ = publish_tx.send(message);
                    }
                }
            });
        }
    });

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = sub_listener.accept().await {
            let mut rx = tx.subscribe();
            tokio::spawn(async move {
                let Ok(Some(command)) = frame::read_message(&mut socket).await else {
                    return;
                };
                let Some(prefix) = command.get(1).cloned() else {
                    return;
                };
                while let Ok(message) = rx.recv().await {
                    let matches = message
                        .first()
                        .is_some_and(|topic| topic.starts_with(&prefix));
                    if matches && frame::write_message(&mut socket, &message).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    ProxyAddress::new("127.0.0.1", pub_addr.port())
}

/// Discovery session with short timeouts.
pub fn discovery(register: Duration, find: Duration) -> DiscoveryService {
    DiscoveryService::new(Arc::new(ConnectionManager::new(
        RequestTimeouts::new(register, find),
        Duration::from_millis(500),
    )))
}

/// A complete registration entry.
pub fn entry(name: &str, topic: &str, port: u16, role: Role) -> RegistrationEntry {
    let Ok(topic) = topic.parse::<Topic>() else {
        panic!("valid topic {topic}");
    };
    RegistrationEntry::new(name, topic, Endpoint::new("127.0.0.1", port), role)
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
