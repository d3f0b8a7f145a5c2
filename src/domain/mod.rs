//! Domain layer: addresses, topics, registration entries and the store.
//!
//! Everything here is plain data plus the in-memory
//! [`RegistrationStore`]; no module in this layer performs I/O.

pub mod endpoint;
pub mod registration;
pub mod registration_store;
pub mod topic;

pub use endpoint::{Endpoint, ProxyAddress, RegistrarAddress};
pub use registration::{RegistrationEntry, RegistrationKey, Role};
pub use registration_store::RegistrationStore;
pub use topic::Topic;
