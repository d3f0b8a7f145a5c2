//! Client side: the per-connection [`RegistrationDriver`] and the pooled
//! [`DiscoveryService`] session built on top of it.

pub mod discovery;
pub mod driver;

pub use discovery::DiscoveryService;
pub use driver::RegistrationDriver;
