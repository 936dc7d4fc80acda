//! Typed access to blockchain data for sandwich detection.
//!
//! The [`ChainDataClient`] trait is the seam between the detection logic and
//! whichever data provider backs it; [`AlchemyClient`] is the JSON-RPC
//! implementation used in production.

pub mod ens;
pub mod error;
pub mod network;
pub mod provider;
pub mod retry;
pub mod rpc_client;
pub mod types;

pub use error::{ChainError, ChainResult};
pub use network::Network;
pub use provider::{ChainClients, ChainDataClient};
pub use rpc_client::{AlchemyClient, RpcSettings};
pub use types::{ChainTransaction, Log, TransactionReceipt, Transfer, TransferDirection};
