//! Address → Electrum scripthash resolution.
//!
//! Electrum servers index outputs by the SHA-256 of their locking script,
//! byte-reversed and hex encoded.

use bitcoin::address::NetworkUnchecked;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::{Address, Network, Script};

use crate::error::CoreError;

pub trait ScripthashResolver: Send + Sync {
    fn scripthash(&self, address: &str) -> Result<String, CoreError>;
}

/// Resolves addresses of one network using the `bitcoin` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkResolver {
    network: Network,
}

impl NetworkResolver {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

impl ScripthashResolver for NetworkResolver {
    fn scripthash(&self, address: &str) -> Result<String, CoreError> {
        let invalid = |message: String| CoreError::InvalidAddress {
            address: address.to_owned(),
            message,
        };
        let unchecked: Address<NetworkUnchecked> =
            address.parse().map_err(|e| invalid(format!("{e}")))?;
        let checked = unchecked
            .require_network(self.network)
            .map_err(|e| invalid(format!("{e}")))?;
        Ok(script_scripthash(&checked.script_pubkey()))
    }
}

pub fn script_scripthash(script: &Script) -> String {
    sha256::Hash::hash(script.as_bytes())
        .to_byte_array()
        .iter()
        .rev()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_address_matches_electrum_docs() {
        let resolver = NetworkResolver::new(Network::Bitcoin);
        let scripthash = resolver
            .scripthash("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
            .unwrap();
        assert_eq!(
            scripthash,
            "8b01df4e368ea28f8dc0423bcf7a4923e3a12d307c875e47a0cfbf90b5c39161"
        );
    }

    #[test]
    fn wrong_network_is_rejected() {
        let resolver = NetworkResolver::new(Network::Testnet);
        let err = resolver
            .scripthash("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa")
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAddress { .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        let resolver = NetworkResolver::new(Network::Bitcoin);
        assert!(resolver.scripthash("not-an-address").is_err());
    }
}
