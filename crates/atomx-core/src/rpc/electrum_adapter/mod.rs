//! Electrum JSON-RPC client over raw sockets.
//!
//! Implements [`ElectrumApi`](super::ElectrumApi) with newline-framed
//! JSON-RPC, one fresh connection per call, and ordered failover across the
//! configured endpoints.

mod client;
mod connection;
mod failover;
mod framing;
mod protocol;

pub use client::ElectrumClient;
pub use connection::{Connector, TcpConnector};
pub use failover::FailoverPolicy;
