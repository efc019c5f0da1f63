//! Custodial wallet gateway: the single funded account rewards are paid from.

pub mod address;
pub mod error;
pub mod json_rpc;
pub mod memory;
pub mod wallet;

pub use address::normalize_address;
pub use error::{GatewayError, GatewayResult};
pub use json_rpc::JsonRpcGateway;
pub use memory::{MemoryGateway, Transfer};
pub use wallet::{TxHash, WalletGateway};
