pub mod config;
pub mod error;
pub mod rpc;
pub mod scripthash;
pub mod types;
pub mod utxo;
pub mod worker;

#[cfg(test)]
mod test_util;

pub use config::{ClientConfig, Endpoint, EndpointSet};
pub use error::{CoreError, RpcError, WorkerError};
pub use rpc::{ElectrumApi, ElectrumClient, FailoverPolicy};
pub use utxo::{wait_until_utxo, PollHandle, UtxoPoller, UtxoWatch};
pub use worker::{WorkerBridge, WorkerResult};
