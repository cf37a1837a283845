use bitcoin::{Amount, Txid};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ==============================================================================
// Unspent Outputs
// ==============================================================================

/// An unspent output as reported by `blockchain.scripthash.listunspent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utxo {
    pub txid: Txid,
    #[serde(rename = "outputIndex")]
    pub output_index: u32,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub value: Amount,
    /// Confirmation height; zero or negative means still in the mempool.
    pub height: i64,
    /// Atomicals attached to this output. Non-empty means the output carries
    /// tokens and must not be spent as plain funding.
    pub atomicals: Vec<serde_json::Value>,
}

impl Utxo {
    pub fn is_confirmed(&self) -> bool {
        self.height > 0
    }

    pub fn has_attached_tokens(&self) -> bool {
        !self.atomicals.is_empty()
    }
}

/// Wire shape of one `listunspent` entry.
#[derive(Deserialize)]
struct ListUnspentEntry {
    tx_hash: Txid,
    tx_pos: u32,
    value: u64,
    #[serde(default)]
    height: Option<i64>,
    #[serde(default)]
    atomicals: Option<Vec<serde_json::Value>>,
}

impl From<ListUnspentEntry> for Utxo {
    fn from(entry: ListUnspentEntry) -> Self {
        Self {
            txid: entry.tx_hash,
            output_index: entry.tx_pos,
            value: Amount::from_sat(entry.value),
            height: entry.height.unwrap_or(0),
            atomicals: entry.atomicals.unwrap_or_default(),
        }
    }
}

/// Balance view over a `listunspent` result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnspentSummary {
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub unconfirmed: Amount,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub confirmed: Amount,
    pub utxos: Vec<Utxo>,
}

impl UnspentSummary {
    /// Decode a raw `listunspent` result and split its value by confirmation.
    pub fn from_listunspent(raw: serde_json::Value) -> Result<Self, CoreError> {
        let entries: Vec<ListUnspentEntry> = serde_json::from_value(raw)
            .map_err(|e| CoreError::InvalidData(format!("invalid listunspent result: {e}")))?;

        let mut unconfirmed = 0u64;
        let mut confirmed = 0u64;
        let mut utxos = Vec::with_capacity(entries.len());
        for entry in entries {
            let utxo = Utxo::from(entry);
            if utxo.is_confirmed() {
                confirmed = confirmed.saturating_add(utxo.value.to_sat());
            } else {
                unconfirmed = unconfirmed.saturating_add(utxo.value.to_sat());
            }
            utxos.push(utxo);
        }

        Ok(Self {
            unconfirmed: Amount::from_sat(unconfirmed),
            confirmed: Amount::from_sat(confirmed),
            utxos,
        })
    }
}

// ==============================================================================
// Atomical References
// ==============================================================================

/// An atomical addressed either by its id string or by its atomical number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AtomicalRef {
    Id(String),
    Number(u64),
}

impl From<&str> for AtomicalRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

impl From<String> for AtomicalRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<u64> for AtomicalRef {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

impl From<AtomicalRef> for serde_json::Value {
    fn from(atomical: AtomicalRef) -> Self {
        match atomical {
            AtomicalRef::Id(id) => serde_json::Value::String(id),
            AtomicalRef::Number(number) => serde_json::Value::from(number),
        }
    }
}
