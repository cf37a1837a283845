use crate::error::RpcError;

/// Only one request is ever in flight per connection, so the id is fixed.
pub(super) const REQUEST_ID: &str = "1";

#[derive(serde::Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    pub(super) method: &'a str,
    pub(super) params: &'a [serde_json::Value],
    pub(super) id: &'static str,
}

impl<'a> JsonRpcRequest<'a> {
    pub(super) fn new(method: &'a str, params: &'a [serde_json::Value]) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id: REQUEST_ID,
        }
    }

    /// Serialize the request as one line, terminator included.
    pub(super) fn to_line(&self) -> Vec<u8> {
        let mut line = serde_json::to_vec(self).expect("request is plain JSON data");
        line.push(b'\n');
        line
    }
}

#[derive(serde::Deserialize)]
pub(super) struct JsonRpcResponse {
    #[serde(default)]
    pub(super) result: Option<serde_json::Value>,
    #[serde(default)]
    pub(super) error: Option<serde_json::Value>,
}

/// Classify one framed response body.
///
/// A truthy `result` is the only success signal. A truthy `error` becomes
/// [`RpcError::Server`]; anything else (unparsable, falsy result, neither
/// field) is a [`RpcError::Protocol`] failure carrying the raw body.
pub(super) fn interpret_response(
    endpoint: &str,
    body: &str,
) -> Result<serde_json::Value, RpcError> {
    let decoded: JsonRpcResponse =
        serde_json::from_str(body).map_err(|e| RpcError::Protocol {
            endpoint: endpoint.to_owned(),
            message: format!("decode JSON-RPC response: {e}; body={}", body.trim_end()),
        })?;

    if let Some(result) = decoded.result {
        if is_truthy(&result) {
            return Ok(result);
        }
    }

    if let Some(err) = decoded.error.filter(is_truthy) {
        return Err(RpcError::Server {
            endpoint: endpoint.to_owned(),
            message: error_message(&err),
        });
    }

    Err(RpcError::Protocol {
        endpoint: endpoint.to_owned(),
        message: body.trim_end().to_owned(),
    })
}

/// JavaScript truthiness, which is what Electrum-facing callers have always
/// relied on: empty arrays and objects count as present.
pub(super) fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

fn error_message(err: &serde_json::Value) -> String {
    match err.get("message").and_then(serde_json::Value::as_str) {
        Some(message) => message.to_owned(),
        None => match err.as_str() {
            Some(text) => text.to_owned(),
            None => err.to_string(),
        },
    }
}
