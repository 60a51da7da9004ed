//! Destination endpoint shared between the control thread and the sender
//!
//! Holds intent only: no resolution or socket work happens here. Every
//! accepted change bumps a revision counter so readers can tell when their
//! cached view is stale.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROUTING_ID, MAX_HOST_LEN, MAX_PORT, MIN_PORT};
use crate::error::ConfigError;

/// Consistent view of the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub routing_id: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            routing_id: DEFAULT_ROUTING_ID.to_string(),
        }
    }
}

impl Endpoint {
    /// Build an endpoint from untrusted values (config file, restored state)
    ///
    /// The port is clamped into range; a malformed host falls back to the
    /// default host.
    pub fn sanitized(host: &str, port: i64, routing_id: &str) -> Self {
        Self {
            host: validate_host(host).unwrap_or_else(|e| {
                tracing::warn!("{}, using {}", e, DEFAULT_HOST);
                DEFAULT_HOST.to_string()
            }),
            port: clamp_port(port),
            routing_id: normalize_routing_id(routing_id),
        }
    }

    /// Same rules as [`Endpoint::sanitized`], applied to an existing value
    pub fn into_sanitized(self) -> Self {
        if !(MIN_PORT..=MAX_PORT).contains(&self.port) {
            tracing::warn!("Port {} out of range, clamping", self.port);
        }
        Self::sanitized(&self.host, self.port as i64, &self.routing_id)
    }
}

/// Reject ports outside `[MIN_PORT, MAX_PORT]`
pub fn validate_port(port: i64) -> Result<u16, ConfigError> {
    if port < MIN_PORT as i64 || port > MAX_PORT as i64 {
        return Err(ConfigError::PortOutOfRange {
            value: port,
            min: MIN_PORT,
            max: MAX_PORT,
        });
    }
    Ok(port as u16)
}

/// Clamp a port to the nearest bound of `[MIN_PORT, MAX_PORT]`
pub fn clamp_port(port: i64) -> u16 {
    port.clamp(MIN_PORT as i64, MAX_PORT as i64) as u16
}

/// Trim a host name and reject empty, oversized or whitespace-containing ones
pub fn validate_host(host: &str) -> Result<String, ConfigError> {
    let trimmed = host.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_HOST_LEN
        || trimmed.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ConfigError::InvalidHost(host.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Make a routing id usable as a single OSC address segment
///
/// Surrounding whitespace and slashes go; characters OSC reserves for
/// pattern matching become `_`.
pub fn normalize_routing_id(id: &str) -> String {
    id.trim()
        .trim_matches('/')
        .chars()
        .map(|c| match c {
            ' ' | '#' | '*' | ',' | '/' | '?' | '[' | ']' | '{' | '}' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Mutable endpoint configuration
pub struct EndpointConfig {
    current: RwLock<Endpoint>,
    revision: AtomicU64,
}

impl EndpointConfig {
    /// Config holding `initial`, sanitized; the port is clamped into range
    pub fn new(initial: Endpoint) -> Self {
        Self {
            current: RwLock::new(initial.into_sanitized()),
            revision: AtomicU64::new(0),
        }
    }

    /// Set the destination host. Malformed hosts are rejected.
    pub fn set_host(&self, host: &str) -> Result<(), ConfigError> {
        let host = validate_host(host)?;
        let mut current = self.current.write();
        if current.host != host {
            tracing::debug!("Endpoint host {} -> {}", current.host, host);
            current.host = host;
            self.bump();
        }
        Ok(())
    }

    /// Set the destination port
    ///
    /// Out-of-range values are rejected and the last valid port is kept.
    pub fn set_port(&self, port: i64) -> Result<u16, ConfigError> {
        let port = validate_port(port)?;
        let mut current = self.current.write();
        if current.port != port {
            tracing::debug!("Endpoint port {} -> {}", current.port, port);
            current.port = port;
            self.bump();
        }
        Ok(port)
    }

    /// Set the routing identifier; returns the normalized value stored
    pub fn set_routing_id(&self, routing_id: &str) -> String {
        let routing_id = normalize_routing_id(routing_id);
        let mut current = self.current.write();
        if current.routing_id != routing_id {
            tracing::debug!("Endpoint routing id {:?} -> {:?}", current.routing_id, routing_id);
            current.routing_id = routing_id.clone();
            self.bump();
        }
        routing_id
    }

    /// Replace all three fields at once, sanitized like [`EndpointConfig::new`]
    pub fn replace(&self, endpoint: Endpoint) {
        let endpoint = endpoint.into_sanitized();
        let mut current = self.current.write();
        if *current != endpoint {
            *current = endpoint;
            self.bump();
        }
    }

    /// Copy of the current endpoint; never mixes fields from different updates
    pub fn snapshot(&self) -> Endpoint {
        self.current.read().clone()
    }

    /// Copy of the current endpoint together with its revision
    pub fn snapshot_with_revision(&self) -> (u64, Endpoint) {
        let current = self.current.read();
        (self.revision.load(Ordering::Acquire), current.clone())
    }

    /// Number of accepted changes so far
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn port(&self) -> u16 {
        self.current.read().port
    }

    // Called with the write lock held so revision and value move together
    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new(Endpoint::default())
    }
}

/// Thread-safe handle to the endpoint configuration
pub type SharedEndpointConfig = Arc<EndpointConfig>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let config = EndpointConfig::default();
        let endpoint = config.snapshot();
        assert_eq!(endpoint.host, DEFAULT_HOST);
        assert_eq!(endpoint.port, DEFAULT_PORT);
        assert_eq!(endpoint.routing_id, DEFAULT_ROUTING_ID);
        assert_eq!(config.revision(), 0);
    }

    #[test]
    fn test_out_of_range_port_keeps_last_valid() {
        let config = EndpointConfig::default();
        assert_eq!(config.set_port(9100), Ok(9100));

        let err = config.set_port(70000).unwrap_err();
        assert_eq!(
            err,
            ConfigError::PortOutOfRange { value: 70000, min: MIN_PORT, max: MAX_PORT }
        );
        assert_eq!(config.port(), 9100);

        assert!(config.set_port(0).is_err());
        assert_eq!(config.port(), 9100);
    }

    #[test]
    fn test_host_validation() {
        let config = EndpointConfig::default();
        config.set_host("  192.168.1.20 ").unwrap();
        assert_eq!(config.snapshot().host, "192.168.1.20");

        assert!(matches!(config.set_host(""), Err(ConfigError::InvalidHost(_))));
        assert!(matches!(config.set_host("my host"), Err(ConfigError::InvalidHost(_))));
        assert_eq!(config.snapshot().host, "192.168.1.20");
    }

    #[test]
    fn test_routing_id_normalized() {
        let config = EndpointConfig::default();
        assert_eq!(config.set_routing_id(" /drums/ "), "drums");
        assert_eq!(config.set_routing_id("bass gtr*"), "bass_gtr_");
        assert_eq!(config.snapshot().routing_id, "bass_gtr_");
        assert_eq!(config.set_routing_id(""), "");
    }

    #[test]
    fn test_revision_moves_only_on_change() {
        let config = EndpointConfig::default();
        config.set_port(DEFAULT_PORT as i64).unwrap();
        assert_eq!(config.revision(), 0);

        config.set_port(9001).unwrap();
        config.set_host("localhost").unwrap();
        config.set_routing_id("keys");
        assert_eq!(config.revision(), 3);

        let (rev, endpoint) = config.snapshot_with_revision();
        assert_eq!(rev, 3);
        assert_eq!(endpoint, Endpoint { host: "localhost".into(), port: 9001, routing_id: "keys".into() });
    }

    #[test]
    fn test_sanitized_endpoint() {
        let endpoint = Endpoint::sanitized("", 70000, "/main/");
        assert_eq!(endpoint.host, DEFAULT_HOST);
        assert_eq!(endpoint.port, MAX_PORT);
        assert_eq!(endpoint.routing_id, "main");

        assert_eq!(Endpoint::sanitized("10.0.0.2", -5, "").port, MIN_PORT);
    }

    #[test]
    fn test_construction_and_replace_clamp_port() {
        let low = Endpoint { port: 80, ..Endpoint::default() };
        let config = EndpointConfig::new(low);
        assert_eq!(config.port(), MIN_PORT);

        config.replace(Endpoint { host: " studio.local ".into(), port: 0, routing_id: "/keys/".into() });
        assert_eq!(
            config.snapshot(),
            Endpoint { host: "studio.local".into(), port: MIN_PORT, routing_id: "keys".into() }
        );

        // Already in range: untouched, so no revision bump
        let before = config.revision();
        config.replace(config.snapshot());
        assert_eq!(config.revision(), before);
    }

    proptest! {
        #[test]
        fn prop_port_never_stored_out_of_range(ports in proptest::collection::vec(any::<i64>(), 1..32)) {
            let config = EndpointConfig::default();
            for p in ports {
                let accepted = config.set_port(p);
                let stored = config.port();
                prop_assert!(stored >= MIN_PORT && stored <= MAX_PORT);
                if let Ok(port) = accepted {
                    prop_assert_eq!(port as i64, p);
                    prop_assert_eq!(stored, port);
                }
            }
        }

        #[test]
        fn prop_replace_never_stores_out_of_range(port in any::<u16>()) {
            let config = EndpointConfig::default();
            config.replace(Endpoint { port, ..Endpoint::default() });
            let stored = config.port();
            prop_assert!(stored >= MIN_PORT && stored <= MAX_PORT);
        }

        #[test]
        fn prop_clamp_port_in_range(p in any::<i64>()) {
            let port = clamp_port(p);
            prop_assert!(port >= MIN_PORT && port <= MAX_PORT);
        }
    }
}
