//! Client configuration and the endpoint set.
//!
//! Endpoints arrive as one comma-separated string (for example
//! `tcp://electrumx-a:50001,tcp://electrumx-b:50001`). The list is parsed once
//! when the client is built and its order is the failover priority.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use bitcoin::Network;
use serde::Deserialize;
use url::{Host, Url};

use crate::error::CoreError;
use crate::rpc::FailoverPolicy;

// ==============================================================================
// Endpoint
// ==============================================================================

/// One Electrum server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    fn parse(raw: &str) -> Result<Self, CoreError> {
        let url = Url::parse(raw).map_err(|e| {
            CoreError::InvalidConfig(format!("invalid endpoint `{raw}`: {e}"))
        })?;
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(CoreError::InvalidConfig(format!(
                    "endpoint `{raw}` has no host"
                )))
            }
        };
        let port = url.port_or_known_default().ok_or_else(|| {
            CoreError::InvalidConfig(format!("endpoint `{raw}` has no port"))
        })?;

        Ok(Self {
            scheme: url.scheme().to_owned(),
            host,
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => write!(f, "{}://[{}]:{}", self.scheme, addr, self.port),
            _ => write!(f, "{}://{}:{}", self.scheme, self.host, self.port),
        }
    }
}

// ==============================================================================
// Endpoint Set
// ==============================================================================

/// Ordered, immutable list of endpoints.
///
/// There is deliberately no way to add or remove entries after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
}

impl EndpointSet {
    /// Parse a comma-separated endpoint list. Blank entries are skipped, so an
    /// empty string yields an empty set.
    ///
    /// Every entry is validated up front: a single malformed entry fails the
    /// whole list here instead of being skipped over at call time.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let endpoints = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Endpoint::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { endpoints })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl<'a> IntoIterator for &'a EndpointSet {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromStr for EndpointSet {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ==============================================================================
// Client Config
// ==============================================================================

pub const ENV_ENDPOINTS: &str = "ELECTRUMX_PROXY_BASE_URL";
pub const ENV_USE_TLS: &str = "ELECTRUMX_USE_TLS";
pub const ENV_FAILOVER: &str = "ELECTRUMX_FAILOVER";
pub const ENV_NETWORK: &str = "ELECTRUMX_NETWORK";

/// Settings for [`crate::rpc::ElectrumClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Comma-separated endpoint URLs, highest priority first.
    pub endpoints: String,
    /// Accepted for compatibility but not honoured: connections are always
    /// plaintext TCP.
    pub use_tls: bool,
    pub failover: FailoverPolicy,
    /// Network used when resolving addresses to scripthashes.
    pub network: Network,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: String::new(),
            use_tls: false,
            failover: FailoverPolicy::default(),
            network: Network::Bitcoin,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoints: impl Into<String>) -> Self {
        Self {
            endpoints: endpoints.into(),
            ..Self::default()
        }
    }

    /// Read configuration from `ELECTRUMX_*` environment variables.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let mut config = Self::default();

        if let Some(endpoints) = lookup(ENV_ENDPOINTS) {
            config.endpoints = endpoints;
        }
        if let Some(raw) = lookup(ENV_USE_TLS) {
            config.use_tls = parse_bool(ENV_USE_TLS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FAILOVER) {
            config.failover = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_NETWORK) {
            config.network = Network::from_str(raw.trim()).map_err(|e| {
                CoreError::InvalidConfig(format!("{ENV_NETWORK}: {e}"))
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(CoreError::InvalidConfig(format!(
            "{key}: expected a boolean, got `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn parse_endpoint_list_preserves_order() {
        let set = EndpointSet::parse("tcp://a.example:50001, tcp://b.example:50002").unwrap();
        let hosts: Vec<_> = set.iter().map(|e| (e.host.as_str(), e.port)).collect();
        assert_eq!(hosts, vec![("a.example", 50001), ("b.example", 50002)]);
        assert_eq!(set.iter().next().unwrap().scheme, "tcp");
    }

    #[test]
    fn empty_string_is_an_empty_set() {
        let set = EndpointSet::parse("").unwrap();
        assert!(set.is_empty());
        assert!(EndpointSet::parse(" , ").unwrap().is_empty());
    }

    #[test]
    fn endpoint_without_port_is_rejected() {
        let err = EndpointSet::parse("tcp://a.example").expect_err("port is required");
        assert!(err.to_string().contains("has no port"));
    }

    #[test]
    fn endpoint_that_is_not_a_url_is_rejected() {
        let err = EndpointSet::parse("a.example:50001,").expect_err("scheme is required");
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn one_malformed_entry_rejects_the_whole_list() {
        let err = EndpointSet::parse("tcp://a.example:50001,tcp://b.example,tcp://c.example:50001")
            .expect_err("middle entry has no port");
        assert!(err.to_string().contains("tcp://b.example"));
    }

    #[test]
    fn ipv6_endpoint_drops_brackets_for_connect() {
        let set = EndpointSet::parse("tcp://[::1]:50001").unwrap();
        let endpoint = set.iter().next().unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.to_string(), "tcp://[::1]:50001");
    }

    #[test]
    fn config_from_lookup_reads_all_keys() {
        let vars: HashMap<&str, &str> = [
            (ENV_ENDPOINTS, "tcp://a:1,tcp://b:2"),
            (ENV_USE_TLS, "true"),
            (ENV_FAILOVER, "aggregate"),
            (ENV_NETWORK, "testnet"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.endpoints, "tcp://a:1,tcp://b:2");
        assert!(config.use_tls);
        assert_eq!(config.failover, FailoverPolicy::Aggregate);
        assert_eq!(config.network, Network::Testnet);
    }

    #[test]
    fn config_from_lookup_rejects_bad_bool() {
        let err = ClientConfig::from_lookup(|key| {
            (key == ENV_USE_TLS).then(|| "maybe".to_owned())
        })
        .expect_err("must reject");
        assert!(err.to_string().contains(ENV_USE_TLS));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"endpoints":"tcp://a:1"}"#).unwrap();
        assert_eq!(config.endpoints, "tcp://a:1");
        assert!(!config.use_tls);
        assert_eq!(config.failover, FailoverPolicy::LastError);
        assert_eq!(config.network, Network::Bitcoin);
    }
}
