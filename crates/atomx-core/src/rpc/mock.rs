use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{CoreError, RpcError};

use super::ElectrumApi;

type Canned = Result<serde_json::Value, String>;

/// A mock Electrum backend for testing. Returns canned results per method,
/// populated via the builder pattern, and records every call it receives.
///
/// Each method has a queue of replies. Replies are consumed in order and the
/// last one repeats forever, so a single canned result answers every call.
pub struct MockElectrum {
    replies: Mutex<HashMap<String, VecDeque<Canned>>>,
    calls: Mutex<Vec<(String, Vec<serde_json::Value>)>>,
}

impl MockElectrum {
    pub fn builder() -> MockElectrumBuilder {
        MockElectrumBuilder {
            replies: HashMap::new(),
        }
    }

    /// Every `(method, params)` pair seen so far, in call order.
    pub fn calls(&self) -> Vec<(String, Vec<serde_json::Value>)> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }
}

pub struct MockElectrumBuilder {
    replies: HashMap<String, VecDeque<Canned>>,
}

impl MockElectrumBuilder {
    pub fn with_result(mut self, method: &str, result: serde_json::Value) -> Self {
        self.replies
            .entry(method.to_owned())
            .or_default()
            .push_back(Ok(result));
        self
    }

    pub fn with_error(mut self, method: &str, message: &str) -> Self {
        self.replies
            .entry(method.to_owned())
            .or_default()
            .push_back(Err(message.to_owned()));
        self
    }

    pub fn build(self) -> MockElectrum {
        MockElectrum {
            replies: Mutex::new(self.replies),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ElectrumApi for MockElectrum {
    async fn call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, CoreError> {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push((method.to_owned(), params));

        let reply = {
            let mut replies = self.replies.lock().expect("mock replies poisoned");
            match replies.get_mut(method) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(RpcError::Server {
                endpoint: "mock".to_owned(),
                message,
            }
            .into()),
            None => Err(RpcError::Server {
                endpoint: "mock".to_owned(),
                message: format!("no canned reply for {method}"),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn replies_are_consumed_in_order_and_last_repeats() {
        let rpc = MockElectrum::builder()
            .with_error("server.version", "down")
            .with_result("server.version", json!(["ElectrumX 1.16", "1.4"]))
            .build();

        assert!(rpc.server_version().await.is_err());
        assert_eq!(
            rpc.server_version().await.unwrap(),
            json!(["ElectrumX 1.16", "1.4"])
        );
        assert!(rpc.server_version().await.is_ok());
        assert_eq!(rpc.call_count("server.version"), 3);
    }

    #[tokio::test]
    async fn unknown_method_is_an_error() {
        let rpc = MockElectrum::builder().build();
        let err = rpc.dump().await.unwrap_err();
        assert!(err.to_string().contains("blockchain.atomicals.dump"));
    }
}
