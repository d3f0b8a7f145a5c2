//! # topic-registrar
//!
//! Registration and discovery control plane for a topic-based
//! publish/subscribe framework.
//!
//! Actors register themselves as publishers or subscribers of a
//! `domain.subject.type` topic with a registrar, and ask registrars which
//! actors serve a topic. A front-end node polls every local registrar and
//! merges their registrations so discovery works from anywhere in the
//! deployment.
//!
//! ## Architecture
//!
//! ```text
//! Actors
//!     │
//!     ├── DiscoveryService / RegistrationDriver (client/)
//!     ├── ConnectionManager, proxy liveness (transport/)
//!     │
//!     │   multipart frames over TCP (protocol/)
//!     │
//!     ├── RegistrarService (service/)
//!     ├── RegistrationStore (domain/)
//!     │
//!     ├── ReplicationLoop, front-end only (service/)
//!     └── HTTP admin surface (api/)
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
