//! Ports for the capability client.

pub mod inbound;
pub mod outbound;

pub use inbound::SearchApi;
pub use outbound::RpcCaller;
