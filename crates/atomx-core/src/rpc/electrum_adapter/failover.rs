use std::str::FromStr;

use serde::Deserialize;

use crate::error::{CoreError, RpcError};

/// What a call reports when every endpoint failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum FailoverPolicy {
    /// Surface only the failure of the last endpoint tried; earlier failures
    /// are logged and dropped.
    #[default]
    #[serde(rename = "last")]
    LastError,
    /// Surface every failure, in endpoint order, as
    /// [`RpcError::AllEndpointsFailed`].
    #[serde(rename = "aggregate")]
    Aggregate,
}

impl FromStr for FailoverPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" | "last_error" => Ok(Self::LastError),
            "aggregate" | "all" => Ok(Self::Aggregate),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown failover policy `{other}`; expected `last` or `aggregate`"
            ))),
        }
    }
}

/// Failures collected while walking the endpoint set for one call.
#[derive(Debug)]
pub(super) struct FailureLog {
    policy: FailoverPolicy,
    failures: Vec<RpcError>,
}

impl FailureLog {
    pub(super) fn new(policy: FailoverPolicy) -> Self {
        Self {
            policy,
            failures: Vec::new(),
        }
    }

    pub(super) fn record(&mut self, err: RpcError) {
        if self.policy == FailoverPolicy::LastError {
            self.failures.clear();
        }
        self.failures.push(err);
    }

    /// The error to surface once the endpoint set is exhausted.
    pub(super) fn into_error(mut self) -> RpcError {
        match (self.policy, self.failures.len()) {
            (_, 0) => RpcError::NoEndpoints,
            (FailoverPolicy::LastError, _) => self
                .failures
                .pop()
                .unwrap_or(RpcError::NoEndpoints),
            (FailoverPolicy::Aggregate, _) => RpcError::AllEndpointsFailed(self.failures),
        }
    }
}
