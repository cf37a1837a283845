//! Electrum protocol abstraction layer.
//!
//! Defines the [`ElectrumApi`] trait and provides a line-framed JSON-RPC
//! implementation with endpoint failover ([`ElectrumClient`]) plus a test
//! mock (`mock::MockElectrum`).

mod electrum_adapter;
#[cfg(test)]
pub mod mock;

pub use electrum_adapter::{Connector, ElectrumClient, FailoverPolicy, TcpConnector};

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Value};

use crate::error::CoreError;
use crate::scripthash::ScripthashResolver;
use crate::types::{AtomicalRef, UnspentSummary};

/// Arguments for `blockchain.atomicals.get_by_container_item_validate`.
#[derive(Debug, Clone)]
pub struct ContainerItemValidation {
    pub container: String,
    pub item: String,
    pub bitworkc: String,
    pub bitworkr: String,
    pub main: String,
    pub main_hash: String,
    pub proof: Value,
    pub check_without_sealed: bool,
}

/// Electrum server methods used by atomicals tooling.
///
/// Implementors only provide [`ElectrumApi::call`]; every other method builds
/// its positional params and forwards them unchanged, returning the server's
/// `result` as-is unless the method says otherwise.
#[async_trait]
pub trait ElectrumApi: Send + Sync {
    /// Perform one logical RPC call and return the server's `result`.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, CoreError>;

    async fn server_version(&self) -> Result<Value, CoreError> {
        self.call("server.version", Vec::new()).await
    }

    async fn get_tx(&self, txid: &str, verbose: bool) -> Result<Value, CoreError> {
        self.call(
            "blockchain.transaction.get",
            vec![json!(txid), flag(verbose)],
        )
        .await
    }

    /// Fetch several transactions concurrently. Fails on the first error.
    async fn txs(&self, txids: &[String], verbose: bool) -> Result<Vec<Value>, CoreError> {
        try_join_all(txids.iter().map(|txid| self.get_tx(txid, verbose))).await
    }

    async fn broadcast(&self, raw_tx: &str, force: bool) -> Result<Value, CoreError> {
        let method = if force {
            "blockchain.transaction.broadcast_force"
        } else {
            "blockchain.transaction.broadcast"
        };
        self.call(method, vec![json!(raw_tx)]).await
    }

    async fn send_transaction(&self, raw_tx: &str) -> Result<Value, CoreError> {
        self.broadcast(raw_tx, false).await
    }

    /// `listunspent` reshaped into confirmed/unconfirmed totals.
    async fn get_unspent_scripthash(&self, scripthash: &str) -> Result<UnspentSummary, CoreError> {
        let raw = self
            .call("blockchain.scripthash.listunspent", vec![json!(scripthash)])
            .await?;
        UnspentSummary::from_listunspent(raw)
    }

    async fn get_unspent_address(
        &self,
        resolver: &dyn ScripthashResolver,
        address: &str,
    ) -> Result<UnspentSummary, CoreError> {
        let scripthash = resolver.scripthash(address)?;
        self.get_unspent_scripthash(&scripthash).await
    }

    async fn history(&self, scripthash: &str) -> Result<Value, CoreError> {
        self.call("blockchain.scripthash.get_history", vec![json!(scripthash)])
            .await
    }

    async fn dump(&self) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.dump", Vec::new()).await
    }

    async fn atomicals_get_global(&self, hashes: u32) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get_global", vec![json!(hashes)])
            .await
    }

    async fn atomicals_get(&self, atomical: AtomicalRef) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get", vec![atomical.into()])
            .await
    }

    async fn atomicals_get_ft_info(&self, atomical: AtomicalRef) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get_ft_info", vec![atomical.into()])
            .await
    }

    async fn atomicals_get_location(&self, atomical: AtomicalRef) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get_location", vec![atomical.into()])
            .await
    }

    async fn atomicals_get_state(
        &self,
        atomical: AtomicalRef,
        verbose: bool,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.get_state",
            vec![atomical.into(), flag(verbose)],
        )
        .await
    }

    async fn atomicals_get_state_history(
        &self,
        atomical: AtomicalRef,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.get_state_history",
            vec![atomical.into()],
        )
        .await
    }

    async fn atomicals_get_event_history(
        &self,
        atomical: AtomicalRef,
    ) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get_events", vec![atomical.into()])
            .await
    }

    async fn atomicals_get_tx_history(&self, atomical: AtomicalRef) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get_tx_history", vec![atomical.into()])
            .await
    }

    async fn atomicals_list(&self, limit: u32, offset: u32, asc: bool) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.list",
            vec![json!(limit), json!(offset), flag(asc)],
        )
        .await
    }

    async fn atomicals_by_scripthash(
        &self,
        scripthash: &str,
        verbose: bool,
    ) -> Result<Value, CoreError> {
        let mut params = vec![json!(scripthash)];
        if verbose {
            params.push(json!(true));
        }
        self.call("blockchain.atomicals.listscripthash", params)
            .await
    }

    async fn atomicals_by_address(
        &self,
        resolver: &dyn ScripthashResolver,
        address: &str,
    ) -> Result<Value, CoreError> {
        let scripthash = resolver.scripthash(address)?;
        self.atomicals_by_scripthash(&scripthash, true).await
    }

    async fn atomicals_at_location(&self, location: &str) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.at_location", vec![json!(location)])
            .await
    }

    async fn atomicals_get_realm_info(
        &self,
        realm_or_subrealm: &str,
        verbose: bool,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.get_realm_info",
            vec![json!(realm_or_subrealm), flag(verbose)],
        )
        .await
    }

    async fn atomicals_get_by_realm(&self, realm: &str) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get_by_realm", vec![json!(realm)])
            .await
    }

    async fn atomicals_get_by_ticker(&self, ticker: &str) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.get_by_ticker", vec![json!(ticker)])
            .await
    }

    async fn atomicals_get_by_container(&self, container: &str) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.get_by_container",
            vec![json!(container)],
        )
        .await
    }

    async fn atomicals_get_container_items(
        &self,
        container: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.get_container_items",
            vec![json!(container), json!(limit), json!(offset)],
        )
        .await
    }

    async fn atomicals_get_by_container_item(
        &self,
        container: &str,
        item: &str,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.get_by_container_item",
            vec![json!(container), json!(item)],
        )
        .await
    }

    async fn atomicals_get_by_container_item_validated(
        &self,
        request: ContainerItemValidation,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.get_by_container_item_validate",
            vec![
                json!(request.container),
                json!(request.item),
                json!(request.bitworkc),
                json!(request.bitworkr),
                json!(request.main),
                json!(request.main_hash),
                request.proof,
                json!(request.check_without_sealed),
            ],
        )
        .await
    }

    async fn atomicals_find_tickers(
        &self,
        prefix: Option<&str>,
        asc: bool,
    ) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.find_tickers", search_args(prefix, asc))
            .await
    }

    async fn atomicals_find_containers(
        &self,
        prefix: Option<&str>,
        asc: bool,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.find_containers",
            search_args(prefix, asc),
        )
        .await
    }

    async fn atomicals_find_realms(
        &self,
        prefix: Option<&str>,
        asc: bool,
    ) -> Result<Value, CoreError> {
        self.call("blockchain.atomicals.find_realms", search_args(prefix, asc))
            .await
    }

    /// The search args travel as a nested array after the parent realm id.
    async fn atomicals_find_subrealms(
        &self,
        parent_realm_id: &str,
        prefix: Option<&str>,
        asc: bool,
    ) -> Result<Value, CoreError> {
        self.call(
            "blockchain.atomicals.find_subrealms",
            vec![
                json!(parent_realm_id),
                Value::Array(search_args(prefix, asc)),
            ],
        )
        .await
    }
}

/// Booleans go over the wire as `0`/`1`.
fn flag(value: bool) -> Value {
    json!(if value { 1 } else { 0 })
}

/// `[prefix or null, order]` where the server reads `1` as descending.
fn search_args(prefix: Option<&str>, asc: bool) -> Vec<Value> {
    let prefix = prefix
        .filter(|p| !p.is_empty())
        .map_or(Value::Null, |p| json!(p));
    vec![prefix, flag(!asc)]
}
