//! Network addresses of registrars, proxies and registered actors.
//!
//! [`Endpoint`] is the plain `host:port` pair carried inside registration
//! entries. [`RegistrarAddress`] and [`ProxyAddress`] are the two flavors
//! the connection manager pools connections for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistrarError;

/// Well-known port every registrar listens on unless configured otherwise.
pub const DEFAULT_REGISTRAR_PORT: u16 = 8888;

/// Default publish port of a proxy.
pub const DEFAULT_PROXY_PORT: u16 = 7771;

/// Offset between a proxy's publish port and its subscribe port.
pub const PROXY_SUBSCRIBE_PORT_OFFSET: u16 = 1;

/// Immutable `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Creates a new endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the `"host-port"` key used by the connection pools.
    #[must_use]
    pub fn pool_key(&self) -> String {
        format!("{}-{}", self.host, self.port)
    }

    /// Returns `host:port`, suitable for `TcpStream::connect`.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses `host[:port]`, using `default_port` when the port is omitted.
    /// IPv6 literals must be bracketed (`[::1]:8888`); the brackets stay
    /// part of the host so the text form remains connectable.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::InvalidRequest`] when the host is empty,
    /// an unbracketed host contains `:`, or the port is not a valid `u16`.
    pub fn parse_with_default(s: &str, default_port: u16) -> Result<Self, RegistrarError> {
        let s = s.trim();
        let invalid =
            |what: &str| RegistrarError::InvalidRequest(format!("{what} in address '{s}'"));
        let parse_port = |port: &str| port.parse::<u16>().map_err(|_| invalid("invalid port"));

        let (host, port) = if s.starts_with('[') {
            let Some((inside, rest)) = s.split_once(']') else {
                return Err(invalid("unterminated '['"));
            };
            let host = s.get(..=inside.len()).unwrap_or_default();
            let port = match rest {
                "" => default_port,
                _ => match rest.strip_prefix(':') {
                    Some(port) => parse_port(port)?,
                    None => return Err(invalid("unexpected text after ']'")),
                },
            };
            if inside.len() <= 1 {
                return Err(invalid("missing host"));
            }
            (host, port)
        } else {
            let (host, port) = match s.rsplit_once(':') {
                Some((host, port)) => (host, parse_port(port)?),
                None => (s, default_port),
            };
            if host.contains(':') {
                return Err(invalid("unbracketed IPv6 host"));
            }
            (host, port)
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Address of a registrar service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrarAddress(Endpoint);

impl RegistrarAddress {
    /// Creates a registrar address on an explicit port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self(Endpoint::new(host, port))
    }

    /// Creates a registrar address on [`DEFAULT_REGISTRAR_PORT`].
    #[must_use]
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_REGISTRAR_PORT)
    }

    /// Returns the underlying endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.0
    }
}

impl FromStr for RegistrarAddress {
    type Err = RegistrarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::parse_with_default(s, DEFAULT_REGISTRAR_PORT).map(Self)
    }
}

impl fmt::Display for RegistrarAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Address of a proxy: a publish port plus the derived subscribe port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddress {
    host: String,
    pub_port: u16,
}

impl ProxyAddress {
    /// Creates a proxy address from its publish port.
    #[must_use]
    pub fn new(host: impl Into<String>, pub_port: u16) -> Self {
        Self {
            host: host.into(),
            pub_port,
        }
    }

    /// Creates a proxy address on [`DEFAULT_PROXY_PORT`].
    #[must_use]
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PROXY_PORT)
    }

    /// Proxy host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port publishers write to.
    #[must_use]
    pub const fn pub_port(&self) -> u16 {
        self.pub_port
    }

    /// Port subscribers read from.
    #[must_use]
    pub const fn sub_port(&self) -> u16 {
        self.pub_port.saturating_add(PROXY_SUBSCRIBE_PORT_OFFSET)
    }

    /// Endpoint of the publish side. Also the pool key of the proxy.
    #[must_use]
    pub fn pub_endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.pub_port)
    }

    /// Endpoint of the subscribe side.
    #[must_use]
    pub fn sub_endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.sub_port())
    }
}

impl FromStr for ProxyAddress {
    type Err = RegistrarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ep = Endpoint::parse_with_default(s, DEFAULT_PROXY_PORT)?;
        Ok(Self::new(ep.host, ep.port))
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.pub_port)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn pool_key_uses_dash() {
        let ep = Endpoint::new("10.0.0.1", 8888);
        assert_eq!(ep.pool_key(), "10.0.0.1-8888");
        assert_eq!(ep.to_string(), "10.0.0.1:8888");
    }

    #[test]
    fn registrar_address_defaults_port() {
        let Ok(addr) = "node1".parse::<RegistrarAddress>() else {
            panic!("valid address");
        };
        assert_eq!(addr.endpoint().port, DEFAULT_REGISTRAR_PORT);

        let Ok(addr) = "node1:9000".parse::<RegistrarAddress>() else {
            panic!("valid address");
        };
        assert_eq!(addr.endpoint().port, 9000);
    }

    #[test]
    fn proxy_sub_port_is_derived() {
        let proxy = ProxyAddress::new("localhost", 7771);
        assert_eq!(proxy.sub_port(), 7772);
        assert_eq!(proxy.pub_endpoint().pool_key(), "localhost-7771");
    }

    #[test]
    fn invalid_addresses_are_rejected() {
        assert!(":8888".parse::<RegistrarAddress>().is_err());
        assert!("host:notaport".parse::<ProxyAddress>().is_err());
    }

    #[test]
    fn bare_ipv6_literals_are_rejected() {
        assert!("::1".parse::<RegistrarAddress>().is_err());
        assert!("fe80::1:8888".parse::<RegistrarAddress>().is_err());
        assert!("[::1".parse::<RegistrarAddress>().is_err());
        assert!("[]:8888".parse::<RegistrarAddress>().is_err());
        assert!("[::1]8888".parse::<RegistrarAddress>().is_err());
    }

    #[test]
    fn bracketed_ipv6_literals_parse() {
        let Ok(addr) = "[::1]:9000".parse::<RegistrarAddress>() else {
            panic!("bracketed address with port");
        };
        assert_eq!(addr.endpoint().host, "[::1]");
        assert_eq!(addr.endpoint().port, 9000);
        assert_eq!(addr.endpoint().socket_addr(), "[::1]:9000");

        let Ok(addr) = "[::1]".parse::<RegistrarAddress>() else {
            panic!("bracketed address without port");
        };
        assert_eq!(addr.endpoint().port, DEFAULT_REGISTRAR_PORT);
    }
}
