//! Shared test helpers for `atomx-core` unit tests.
//!
//! Consolidates the scripted in-memory connector, a fixed scripthash
//! resolver, and `listunspent` entry builders so that tests across modules
//! share a single source of truth for dummy data construction.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use crate::config::Endpoint;
use crate::error::CoreError;
use crate::rpc::Connector;
use crate::scripthash::ScripthashResolver;

// ==============================================================================
// Scripted Connector
// ==============================================================================

#[derive(Clone)]
enum Script {
    Refuse,
    Reply(Vec<String>),
}

/// In-memory [`Connector`] keyed by endpoint host.
///
/// Each connection reads one request line, records it, writes the scripted
/// chunks one by one, and closes. Hosts without a script refuse.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    scripts: HashMap<String, Script>,
    attempts: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(mut self, host: &str) -> Self {
        self.scripts.insert(host.to_owned(), Script::Refuse);
        self
    }

    /// Reply with `body` in one write. Include the trailing `\n`.
    pub fn reply(self, host: &str, body: &str) -> Self {
        self.reply_chunks(host, vec![body.to_owned()])
    }

    pub fn reply_chunks(mut self, host: &str, chunks: Vec<String>) -> Self {
        self.scripts.insert(host.to_owned(), Script::Reply(chunks));
        self
    }

    /// Hosts connected to, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().expect("attempt log poisoned").clone()
    }

    /// Request lines received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Stream = DuplexStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<DuplexStream> {
        self.attempts
            .lock()
            .expect("attempt log poisoned")
            .push(endpoint.host.clone());

        let chunks = match self.scripts.get(&endpoint.host) {
            Some(Script::Reply(chunks)) => chunks.clone(),
            Some(Script::Refuse) | None => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("{} refused the connection", endpoint.host),
                ))
            }
        };

        let (client, server) = duplex(8 * 1024);
        let requests = Arc::clone(&self.requests);
        tokio::spawn(async move {
            let (read_half, mut write_half) = tokio::io::split(server);
            let mut request = String::new();
            if BufReader::new(read_half)
                .read_line(&mut request)
                .await
                .is_err()
            {
                return;
            }
            requests.lock().expect("request log poisoned").push(request);
            for chunk in chunks {
                if write_half.write_all(chunk.as_bytes()).await.is_err() {
                    return;
                }
                let _ = write_half.flush().await;
            }
        });

        Ok(client)
    }
}

// ==============================================================================
// Scripthash Resolver
// ==============================================================================

/// Maps `address` to `sh:address`; the address `invalid` fails.
pub struct FixedResolver;

impl ScripthashResolver for FixedResolver {
    fn scripthash(&self, address: &str) -> Result<String, CoreError> {
        if address == "invalid" {
            return Err(CoreError::InvalidAddress {
                address: address.to_owned(),
                message: "rejected by test resolver".to_owned(),
            });
        }
        Ok(format!("sh:{address}"))
    }
}

// ==============================================================================
// listunspent Builders
// ==============================================================================

/// Create a deterministic txid hex string from a single distinguishing byte.
pub fn txid_hex(b: u8) -> String {
    format!("{b:02x}{}", "00".repeat(31))
}

/// A confirmed, token-free `listunspent` entry.
pub fn unspent(tx: u8, value: u64) -> serde_json::Value {
    unspent_at(tx, value, 800_000)
}

pub fn unspent_at(tx: u8, value: u64, height: i64) -> serde_json::Value {
    json!({
        "tx_hash": txid_hex(tx),
        "tx_pos": 0,
        "value": value,
        "height": height,
        "atomicals": []
    })
}

/// A confirmed entry carrying one attached atomical.
pub fn unspent_with_atomical(tx: u8, value: u64) -> serde_json::Value {
    json!({
        "tx_hash": txid_hex(tx),
        "tx_pos": 0,
        "value": value,
        "height": 800_000,
        "atomicals": [format!("{}i0", txid_hex(0xee))]
    })
}
