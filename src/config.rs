//! Registrar configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Missing or unparsable numeric values fall back to their
//! defaults; unparsable addresses are an error.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::RegistrarAddress;
use crate::domain::endpoint::DEFAULT_REGISTRAR_PORT;

/// Default register/remove reply timeout.
pub const DEFAULT_REGISTER_TIMEOUT: Duration = Duration::from_secs(3);

/// Default find reply timeout.
pub const DEFAULT_FIND_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side reply timeouts.
///
/// The find timeout is never shorter than the register timeout: a find
/// against the front-end may need it to have aggregated data first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    register: Duration,
    find: Duration,
}

impl RequestTimeouts {
    /// Creates timeouts, raising `find` to `register` if it is shorter.
    #[must_use]
    pub fn new(register: Duration, find: Duration) -> Self {
        if find < register {
            tracing::warn!(
                ?register,
                ?find,
                "find timeout shorter than register timeout, raising it"
            );
        }
        Self {
            register,
            find: find.max(register),
        }
    }

    /// Timeout for register and remove requests.
    #[must_use]
    pub const fn register(&self) -> Duration {
        self.register
    }

    /// Timeout for find requests.
    #[must_use]
    pub const fn find(&self) -> Duration {
        self.find
    }
}

impl RequestTimeouts {
    /// Builds timeouts from whole seconds. Zero is raised to one second.
    #[must_use]
    pub fn from_secs(register: u64, find: u64) -> Self {
        Self::new(
            Duration::from_secs(register.max(1)),
            Duration::from_secs(find.max(1)),
        )
    }
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTER_TIMEOUT, DEFAULT_FIND_TIMEOUT)
    }
}

/// Top-level registrar configuration.
///
/// Loaded once at startup via [`RegistrarConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Address the registrar service binds to.
    pub listen_addr: SocketAddr,

    /// Address the HTTP admin surface binds to.
    pub admin_addr: SocketAddr,

    /// Whether this node is the front-end and runs replication.
    pub front_end: bool,

    /// Local registrars polled by the front-end.
    pub local_registrars: Vec<RegistrarAddress>,

    /// Client reply timeouts.
    pub timeouts: RequestTimeouts,

    /// Period of the replication loop.
    pub replication_interval: Duration,

    /// Window for a proxy liveness check.
    pub proxy_check_timeout: Duration,
}

impl RegistrarConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `REGISTRAR_HOST`/`REGISTRAR_PORT` or
    /// `ADMIN_LISTEN_ADDR` do not form a valid socket address, or if an entry
    /// of `LOCAL_REGISTRARS` cannot be parsed.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let host = std::env::var("REGISTRAR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_env("REGISTRAR_PORT", DEFAULT_REGISTRAR_PORT);
        let listen_addr: SocketAddr = format!("{host}:{port}").parse()?;

        let admin_addr: SocketAddr = std::env::var("ADMIN_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8889".to_string())
            .parse()?;

        let front_end = parse_env_bool("FRONT_END", false);
        let local_registrars = parse_registrar_list(
            &std::env::var("LOCAL_REGISTRARS").unwrap_or_default(),
        )?;

        let timeouts = RequestTimeouts::from_secs(
            parse_env("REGISTER_TIMEOUT_SECS", DEFAULT_REGISTER_TIMEOUT.as_secs()),
            parse_env("FIND_TIMEOUT_SECS", DEFAULT_FIND_TIMEOUT.as_secs()),
        );

        let replication_interval =
            Duration::from_secs(parse_env("REPLICATION_INTERVAL_SECS", 5).max(1));
        let proxy_check_timeout = Duration::from_millis(parse_env("PROXY_CHECK_TIMEOUT_MS", 1_000));

        Ok(Self {
            listen_addr,
            admin_addr,
            front_end,
            local_registrars,
            timeouts,
            replication_interval,
            proxy_check_timeout,
        })
    }
}

/// Parses a comma-separated `host[:port]` list, skipping blank items.
///
/// # Errors
///
/// Returns the parse error of the first invalid item.
pub fn parse_registrar_list(
    raw: &str,
) -> Result<Vec<RegistrarAddress>, crate::error::RegistrarError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn find_timeout_is_raised_to_register_timeout() {
        let t = RequestTimeouts::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(t.find(), Duration::from_secs(5));
        assert_eq!(t.register(), Duration::from_secs(5));
    }

    #[test]
    fn zero_second_timeouts_are_raised() {
        let t = RequestTimeouts::from_secs(0, 0);
        assert_eq!(t.register(), Duration::from_secs(1));
        assert_eq!(t.find(), Duration::from_secs(1));
    }

    #[test]
    fn default_timeouts_are_ordered() {
        let t = RequestTimeouts::default();
        assert!(t.find() >= t.register());
        assert!(t.register() > Duration::ZERO);
    }

    #[test]
    fn registrar_list_parsing() {
        let Ok(list) = parse_registrar_list(" node1, node2:9000 ,,") else {
            panic!("valid list");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.get(1).map(|a| a.endpoint().port),
            Some(9000)
        );

        let Ok(empty) = parse_registrar_list("") else {
            panic!("empty list is valid");
        };
        assert!(empty.is_empty());

        assert!(parse_registrar_list("node1,:1").is_err());
    }
}
