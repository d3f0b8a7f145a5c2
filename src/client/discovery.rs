//! Discovery service: registration calls over pooled registrar connections.

use std::sync::Arc;

use super::driver::RegistrationDriver;
use crate::domain::{RegistrarAddress, RegistrationEntry, Role, Topic};
use crate::error::RegistrarError;
use crate::transport::ConnectionManager;

/// Client session for registering and discovering actors.
///
/// Every call acquires a [`RegistrationDriver`] from the shared
/// [`ConnectionManager`], performs one request, and releases the driver
/// back to the pool only if the request returned normally. A failed call
/// drops its connection, leaving the pool untouched.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    manager: Arc<ConnectionManager>,
}

impl DiscoveryService {
    /// Creates a session over `manager`.
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Returns the shared connection manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Registers `entry` as a `role` with the registrar at `address`.
    ///
    /// # Errors
    ///
    /// Propagates the [`RegistrarError`] of
    /// [`RegistrationDriver::register`], or a connection error if the
    /// manager is shut down.
    pub async fn register(
        &self,
        address: &RegistrarAddress,
        entry: &RegistrationEntry,
        role: Role,
    ) -> Result<(), RegistrarError> {
        let mut conn = self.manager.registrar_connection(address)?;
        conn.register(entry, role).await?;
        self.manager.release_registrar_connection(conn);
        tracing::info!(registrar = %address, name = %entry.name, topic = %entry.topic, %role, "registered");
        Ok(())
    }

    /// Removes the `role` registration of `entry` from the registrar at
    /// `address`.
    ///
    /// # Errors
    ///
    /// Propagates the [`RegistrarError`] of
    /// [`RegistrationDriver::deregister`].
    pub async fn deregister(
        &self,
        address: &RegistrarAddress,
        entry: &RegistrationEntry,
        role: Role,
    ) -> Result<(), RegistrarError> {
        let mut conn = self.manager.registrar_connection(address)?;
        conn.deregister(entry, role).await?;
        self.manager.release_registrar_connection(conn);
        tracing::info!(registrar = %address, name = %entry.name, topic = %entry.topic, %role, "deregistered");
        Ok(())
    }

    /// Finds `role` registrations matching the topic of `query`.
    ///
    /// # Errors
    ///
    /// Propagates the [`RegistrarError`] of [`RegistrationDriver::find`].
    pub async fn find(
        &self,
        address: &RegistrarAddress,
        query: &RegistrationEntry,
        role: Role,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        self.find_topic(address, &query.name, query.topic.clone(), role).await
    }

    /// Finds `role` registrations matching `topic` on behalf of `sender`.
    ///
    /// # Errors
    ///
    /// Propagates the [`RegistrarError`] of
    /// [`RegistrationDriver::find_topic`].
    pub async fn find_topic(
        &self,
        address: &RegistrarAddress,
        sender: &str,
        topic: Topic,
        role: Role,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        let mut conn = self.manager.registrar_connection(address)?;
        let found = conn.find_topic(sender, topic, role).await?;
        self.manager.release_registrar_connection(conn);
        Ok(found)
    }

    /// Registers `entry` as a publisher.
    ///
    /// # Errors
    ///
    /// See [`Self::register`].
    pub async fn register_publisher(
        &self,
        address: &RegistrarAddress,
        entry: &RegistrationEntry,
    ) -> Result<(), RegistrarError> {
        self.register(address, entry, Role::Publisher).await
    }

    /// Registers `entry` as a subscriber.
    ///
    /// # Errors
    ///
    /// See [`Self::register`].
    pub async fn register_subscriber(
        &self,
        address: &RegistrarAddress,
        entry: &RegistrationEntry,
    ) -> Result<(), RegistrarError> {
        self.register(address, entry, Role::Subscriber).await
    }

    /// Removes a publisher registration.
    ///
    /// # Errors
    ///
    /// See [`Self::deregister`].
    pub async fn remove_publisher(
        &self,
        address: &RegistrarAddress,
        entry: &RegistrationEntry,
    ) -> Result<(), RegistrarError> {
        self.deregister(address, entry, Role::Publisher).await
    }

    /// Removes a subscriber registration.
    ///
    /// # Errors
    ///
    /// See [`Self::deregister`].
    pub async fn remove_subscriber(
        &self,
        address: &RegistrarAddress,
        entry: &RegistrationEntry,
    ) -> Result<(), RegistrarError> {
        self.deregister(address, entry, Role::Subscriber).await
    }

    /// Finds publishers on the topic of `query`.
    ///
    /// # Errors
    ///
    /// See [`Self::find`].
    pub async fn find_publishers(
        &self,
        address: &RegistrarAddress,
        query: &RegistrationEntry,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        self.find(address, query, Role::Publisher).await
    }

    /// Finds subscribers on the topic of `query`.
    ///
    /// # Errors
    ///
    /// See [`Self::find`].
    pub async fn find_subscribers(
        &self,
        address: &RegistrarAddress,
        query: &RegistrationEntry,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        self.find(address, query, Role::Subscriber).await
    }
}
