//! Outbound connection handling: pools, proxy connections and the
//! [`ConnectionManager`] that owns them.

pub mod manager;
pub mod pool;
pub mod proxy;

pub use manager::ConnectionManager;
pub use pool::ConnectionPool;
pub use proxy::ProxyConnection;
