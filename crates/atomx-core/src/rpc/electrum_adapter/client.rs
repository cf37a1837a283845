use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::config::{ClientConfig, Endpoint, EndpointSet};
use crate::error::{CoreError, RpcError};

use super::super::ElectrumApi;
use super::connection::{exchange, Connector, TcpConnector};
use super::failover::{FailoverPolicy, FailureLog};
use super::protocol::{interpret_response, JsonRpcRequest};

/// Electrum JSON-RPC client over line-framed sockets.
///
/// Every call walks the endpoint set in order, opening a fresh connection
/// per attempt, and returns the first truthy `result`. Endpoints that fail
/// are not remembered: the next call starts again from the first endpoint.
/// There is no per-request timeout, so an endpoint that accepts the
/// connection and never answers stalls the call.
pub struct ElectrumClient<C = TcpConnector> {
    endpoints: EndpointSet,
    connector: C,
    policy: FailoverPolicy,
    use_tls: bool,
}

impl ElectrumClient<TcpConnector> {
    /// Create a TCP client from a comma-separated endpoint list.
    pub fn new(endpoints: &str) -> Result<Self, CoreError> {
        Ok(Self::with_connector(
            EndpointSet::parse(endpoints)?,
            TcpConnector,
        ))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, CoreError> {
        let client = Self::with_connector(EndpointSet::parse(&config.endpoints)?, TcpConnector)
            .with_policy(config.failover);
        Ok(client.with_tls(config.use_tls))
    }
}

impl<C: Connector> ElectrumClient<C> {
    pub fn with_connector(endpoints: EndpointSet, connector: C) -> Self {
        Self {
            endpoints,
            connector,
            policy: FailoverPolicy::default(),
            use_tls: false,
        }
    }

    pub fn with_policy(mut self, policy: FailoverPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Record the TLS preference. TLS is not implemented; connections stay
    /// plaintext regardless.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        if use_tls {
            warn!("TLS was requested for Electrum endpoints but is not supported; using plaintext TCP");
        }
        self.use_tls = use_tls;
        self
    }

    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    pub fn policy(&self) -> FailoverPolicy {
        self.policy
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    async fn call_endpoint(
        &self,
        endpoint: &Endpoint,
        method: &str,
        request_line: &[u8],
    ) -> Result<serde_json::Value, RpcError> {
        let label = endpoint.to_string();
        let mut stream =
            self.connector
                .connect(endpoint)
                .await
                .map_err(|source| RpcError::Connection {
                    endpoint: label.clone(),
                    source,
                })?;

        let body = exchange(&mut stream, &label, request_line).await?;
        debug!(rpc.method = method, endpoint = %label, body_len = body.len(), "rpc response");
        trace!(rpc.method = method, endpoint = %label, body = %body.trim_end(), "rpc response body");

        interpret_response(&label, &body)
    }
}

#[async_trait]
impl<C: Connector> ElectrumApi for ElectrumClient<C> {
    async fn call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, CoreError> {
        debug!(
            rpc.method = method,
            rpc.params = params.len(),
            endpoints = self.endpoints.len(),
            "rpc call"
        );
        let request_line = JsonRpcRequest::new(method, &params).to_line();

        let mut failures = FailureLog::new(self.policy);
        for endpoint in &self.endpoints {
            match self.call_endpoint(endpoint, method, &request_line).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    warn!(
                        rpc.method = method,
                        %endpoint,
                        error = %err,
                        "rpc call failed at endpoint"
                    );
                    failures.record(err);
                }
            }
        }

        Err(failures.into_error().into())
    }
}
