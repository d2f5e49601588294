//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 surface for QueueEase: queue operations, shop management and
//! live queue subscriptions.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig, DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
