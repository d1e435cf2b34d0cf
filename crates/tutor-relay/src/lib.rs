//! Tutor Relay — background-context glue.
//!
//! Two surfaces: a port-based streaming fetch proxy ([`fetch`]) that lets a
//! restricted caller run one cross-origin HTTP exchange per channel, and a
//! typed RPC dispatcher ([`rpc`]) routing named store calls.

pub mod fetch;
pub mod port;
pub mod rpc;

pub use fetch::{serve_port, FetchDetails, FetchOptions};
pub use port::{relay_channel, PortEvent, PortRequest, RelayHandle, RelayPort, ResponseMetadata};
pub use rpc::{Dispatcher, RpcRequest, RpcResponse};
