//! Service layer: the registrar request loop and the front-end replication
//! loop.
//!
//! [`RegistrarService`] serves one request at a time against its
//! [`crate::domain::RegistrationStore`]; [`ReplicationLoop`] keeps a
//! front-end store filled from every local registrar.

pub mod registrar;
pub mod replication;

pub use registrar::RegistrarService;
pub use replication::{
    CycleReport, ReplicationHandle, ReplicationLoop, ReplicationMonitor, ReplicationStats,
};
