//! Request timeouts and error replies seen by a single driver.

#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use common::{TestRegistrar, entry, spawn_stub_registrar};
use topic_registrar::client::{DiscoveryService, RegistrationDriver};
use topic_registrar::config::RequestTimeouts;
use topic_registrar::domain::{Role, Topic};
use topic_registrar::transport::ConnectionManager;
use topic_registrar::error::RegistrarError;
use topic_registrar::protocol::{Action, RegRequest, RequestPayload};

#[tokio::test]
async fn timeout_leaves_driver_usable() {
    let address = spawn_stub_registrar(1).await;
    let timeout = Duration::from_millis(200);
    let mut driver = RegistrationDriver::new(address, RequestTimeouts::new(timeout, timeout));
    let e = entry("quotes", "market.fx.tick", 7201, Role::Publisher);

    let started = Instant::now();
    let result = driver.register(&e, Role::Publisher).await;
    let Err(RegistrarError::Timeout { action, timeout: waited, .. }) = result else {
        panic!("expected timeout");
    };
    assert_eq!(action, "registerPublisher");
    assert_eq!(waited, timeout);
    assert!(started.elapsed() >= timeout);
    assert!(!driver.is_connected());

    let Ok(()) = driver.register(&e, Role::Publisher).await else {
        panic!("second request should be answered");
    };
    assert!(driver.is_connected());
}

#[tokio::test]
async fn find_uses_the_find_timeout() {
    let address = spawn_stub_registrar(usize::MAX).await;
    let mut driver = RegistrationDriver::new(
        address,
        RequestTimeouts::new(Duration::from_millis(100), Duration::from_millis(300)),
    );
    let query = entry("pricer", "market.fx.tick", 7202, Role::Subscriber);

    let Err(RegistrarError::Timeout { action, timeout, .. }) =
        driver.find(&query, Role::Publisher).await
    else {
        panic!("expected timeout");
    };
    assert_eq!(action, "findPublisher");
    assert_eq!(timeout, Duration::from_millis(300));
}

#[tokio::test]
async fn error_reply_becomes_registration_error() {
    let registrar = TestRegistrar::start().await;
    let mut driver =
        RegistrationDriver::new(registrar.address.clone(), RequestTimeouts::default());

    let mut incomplete = entry("quotes", "market.fx.tick", 7203, Role::Publisher);
    incomplete.endpoint.port = 0;
    let request = RegRequest {
        action: Action::Register(Role::Publisher),
        sender: "quotes".to_string(),
        payload: RequestPayload::Entry(incomplete),
    };

    let result = driver.send(&request, Duration::from_secs(2)).await;
    let Err(RegistrarError::Registration { message, .. }) = result else {
        panic!("expected registration error");
    };
    assert!(message.contains("incomplete"));
    assert!(registrar.store.is_empty().await);

    // The connection survives a server-side error status.
    assert!(driver.is_connected());
}

#[tokio::test]
async fn cancellation_interrupts_a_pending_request() {
    let address = spawn_stub_registrar(usize::MAX).await;
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let long = Duration::from_secs(10);
    let mut driver =
        RegistrationDriver::new(address, RequestTimeouts::new(long, long)).with_cancellation(cancel_rx);
    let e = entry("quotes", "market.fx.tick", 7204, Role::Publisher);

    let pending = tokio::spawn(async move {
        let result = driver.register(&e, Role::Publisher).await;
        (driver, result)
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let started = Instant::now();
    let _ = cancel_tx.send(true);

    let Ok((driver, result)) = pending.await else {
        panic!("request task panicked");
    };
    assert!(started.elapsed() < long);
    let Err(RegistrarError::Registration { action, message, .. }) = result else {
        panic!("expected registration error, got {result:?}");
    };
    assert_eq!(action, "registerPublisher");
    assert!(message.contains("interrupted"));
    assert!(!driver.is_connected());
}

#[tokio::test]
async fn interrupted_session_leaves_pool_empty() {
    let address = spawn_stub_registrar(usize::MAX).await;
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let long = Duration::from_secs(10);
    let manager = Arc::new(
        ConnectionManager::new(RequestTimeouts::new(long, long), Duration::from_millis(500))
            .with_cancellation(cancel_rx),
    );
    let session = DiscoveryService::new(Arc::clone(&manager));

    let pending = {
        let session = session.clone();
        let address = address.clone();
        tokio::spawn(async move {
            session
                .find_topic(&address, "pricer", Topic::any(), Role::Publisher)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let _ = cancel_tx.send(true);

    let Ok(result) = pending.await else {
        panic!("request task panicked");
    };
    let Err(RegistrarError::Registration { message, .. }) = result else {
        panic!("expected registration error, got {result:?}");
    };
    assert!(message.contains("interrupted"));
    assert_eq!(manager.cached_registrar_connections(), 0);
    assert!(!manager.is_shut_down());
}
