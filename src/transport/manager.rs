//! Connection manager owning the registrar and proxy pools.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use super::pool::ConnectionPool;
use super::proxy::ProxyConnection;
use crate::client::RegistrationDriver;
use crate::client::driver::never_cancelled;
use crate::config::RequestTimeouts;
use crate::domain::{ProxyAddress, RegistrarAddress};
use crate::error::RegistrarError;

/// Pools outbound connections so protocol code never handles their
/// lifecycle.
///
/// One pool caches [`RegistrationDriver`]s by registrar endpoint, the other
/// caches [`ProxyConnection`]s by proxy publish endpoint. Both follow the
/// first-wins release policy: a released connection is cached only if its
/// slot is empty, otherwise it is dropped (and its socket closed).
///
/// The manager is an explicit value: whoever needs it (an actor session, the
/// front-end process) owns it and shares it by `Arc`.
#[derive(Debug)]
pub struct ConnectionManager {
    registrars: ConnectionPool<RegistrationDriver>,
    proxies: ConnectionPool<ProxyConnection>,
    timeouts: RequestTimeouts,
    proxy_check_timeout: Duration,
    cancel: watch::Receiver<bool>,
    shut_down: AtomicBool,
}

impl ConnectionManager {
    /// Creates a manager with empty pools.
    #[must_use]
    pub fn new(timeouts: RequestTimeouts, proxy_check_timeout: Duration) -> Self {
        Self {
            registrars: ConnectionPool::new(),
            proxies: ConnectionPool::new(),
            timeouts,
            proxy_check_timeout,
            cancel: never_cancelled(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Hands `cancel` to every registrar connection this manager creates.
    /// Requests waiting for a reply fail once it turns `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Timeouts handed to new registrar connections.
    #[must_use]
    pub const fn timeouts(&self) -> RequestTimeouts {
        self.timeouts
    }

    /// Returns the cached connection to `address`, or a new unconnected one.
    ///
    /// Registrar connections are not probed for liveness here; the first
    /// request surfaces any failure.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Connection`] after [`Self::shutdown`].
    pub fn registrar_connection(
        &self,
        address: &RegistrarAddress,
    ) -> Result<RegistrationDriver, RegistrarError> {
        self.ensure_open(&address.to_string())?;
        if let Some(cached) = self.registrars.take(&address.endpoint().pool_key()) {
            return Ok(cached);
        }
        Ok(RegistrationDriver::new(address.clone(), self.timeouts)
            .with_cancellation(self.cancel.clone()))
    }

    /// Hands `conn` back for reuse under first-wins policy.
    pub fn release_registrar_connection(&self, conn: RegistrationDriver) {
        if self.is_shut_down() {
            return;
        }
        let key = conn.address().endpoint().pool_key();
        if let Some(discarded) = self.registrars.put_if_vacant(key, conn) {
            tracing::debug!(
                registrar = %discarded.address(),
                id = discarded.id(),
                "registrar connection slot occupied, closing released connection"
            );
        }
    }

    /// Opens a fresh proxy connection and checks its liveness.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Connection`] if the proxy cannot be reached
    /// or the liveness check fails.
    pub async fn create_proxy_connection(
        &self,
        address: &ProxyAddress,
    ) -> Result<ProxyConnection, RegistrarError> {
        self.ensure_open(&address.to_string())?;
        let mut conn = ProxyConnection::connect(address.clone(), self.proxy_check_timeout).await?;
        if !conn.check_connection(self.proxy_check_timeout).await {
            tracing::warn!(proxy = %address, "proxy liveness check failed");
            return Err(RegistrarError::Connection {
                endpoint: address.to_string(),
                reason: "could not connect: liveness check failed".to_string(),
            });
        }
        Ok(conn)
    }

    /// Returns the cached connection to `address`, or a new checked one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_proxy_connection`] when nothing is cached.
    pub async fn proxy_connection(
        &self,
        address: &ProxyAddress,
    ) -> Result<ProxyConnection, RegistrarError> {
        self.ensure_open(&address.to_string())?;
        if let Some(cached) = self.proxies.take(&address.pub_endpoint().pool_key()) {
            return Ok(cached);
        }
        self.create_proxy_connection(address).await
    }

    /// Hands `conn` back for reuse under first-wins policy.
    pub fn release_proxy_connection(&self, conn: ProxyConnection) {
        if self.is_shut_down() {
            return;
        }
        let key = conn.address().pub_endpoint().pool_key();
        if let Some(discarded) = self.proxies.put_if_vacant(key, conn) {
            tracing::debug!(
                proxy = %discarded.address(),
                id = discarded.id(),
                "proxy connection slot occupied, closing released connection"
            );
        }
    }

    /// Closes every cached connection. Idempotent; every later acquire
    /// fails and every later release drops its connection.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let registrars = self.registrars.drain().len();
        let proxies = self.proxies.drain().len();
        tracing::info!(registrars, proxies, "connection manager shut down");
    }

    /// Returns `true` once [`Self::shutdown`] has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of idle registrar connections.
    #[must_use]
    pub fn cached_registrar_connections(&self) -> usize {
        self.registrars.len()
    }

    /// Number of idle proxy connections.
    #[must_use]
    pub fn cached_proxy_connections(&self) -> usize {
        self.proxies.len()
    }

    fn ensure_open(&self, endpoint: &str) -> Result<(), RegistrarError> {
        if self.is_shut_down() {
            return Err(RegistrarError::Connection {
                endpoint: endpoint.to_string(),
                reason: "connection manager is shut down".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(RequestTimeouts::default(), Duration::from_secs(1))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn addr() -> RegistrarAddress {
        RegistrarAddress::new("127.0.0.1", 8888)
    }

    #[test]
    fn new_connection_when_pool_is_empty() {
        let manager = ConnectionManager::default();
        let Ok(conn) = manager.registrar_connection(&addr()) else {
            panic!("manager is open");
        };
        assert!(!conn.is_connected());
        assert_eq!(conn.address(), &addr());
    }

    #[test]
    fn released_connection_is_reused() {
        let manager = ConnectionManager::default();
        let Ok(conn) = manager.registrar_connection(&addr()) else {
            panic!("manager is open");
        };
        let id = conn.id();
        manager.release_registrar_connection(conn);
        assert_eq!(manager.cached_registrar_connections(), 1);

        let Ok(again) = manager.registrar_connection(&addr()) else {
            panic!("manager is open");
        };
        assert_eq!(again.id(), id);
        assert_eq!(manager.cached_registrar_connections(), 0);
    }

    #[test]
    fn first_release_wins() {
        let manager = ConnectionManager::default();
        let (Ok(c1), Ok(c2)) = (
            manager.registrar_connection(&addr()),
            manager.registrar_connection(&addr()),
        ) else {
            panic!("manager is open");
        };
        let first = c1.id();
        assert_ne!(first, c2.id());

        manager.release_registrar_connection(c1);
        manager.release_registrar_connection(c2);
        assert_eq!(manager.cached_registrar_connections(), 1);

        let Ok(next) = manager.registrar_connection(&addr()) else {
            panic!("manager is open");
        };
        assert_eq!(next.id(), first);
    }

    #[test]
    fn pools_are_keyed_by_endpoint() {
        let manager = ConnectionManager::default();
        let other = RegistrarAddress::new("127.0.0.1", 9999);
        let (Ok(a), Ok(b)) = (
            manager.registrar_connection(&addr()),
            manager.registrar_connection(&other),
        ) else {
            panic!("manager is open");
        };
        manager.release_registrar_connection(a);
        manager.release_registrar_connection(b);
        assert_eq!(manager.cached_registrar_connections(), 2);
    }

    #[test]
    fn shutdown_is_idempotent_and_final() {
        let manager = ConnectionManager::default();
        let Ok(conn) = manager.registrar_connection(&addr()) else {
            panic!("manager is open");
        };
        manager.release_registrar_connection(conn);

        manager.shutdown();
        manager.shutdown();
        assert!(manager.is_shut_down());
        assert_eq!(manager.cached_registrar_connections(), 0);
        assert!(matches!(
            manager.registrar_connection(&addr()),
            Err(RegistrarError::Connection { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_proxy_fails_fast() {
        let manager = ConnectionManager::new(RequestTimeouts::default(), Duration::from_millis(300));
        let result = manager
            .proxy_connection(&ProxyAddress::new("127.0.0.1", 1))
            .await;
        let Err(RegistrarError::Connection { endpoint, .. }) = result else {
            panic!("expected connection error");
        };
        assert_eq!(endpoint, "127.0.0.1:1");
    }
}
