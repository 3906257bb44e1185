//! Networked execution
//!
//! # Architecture
//!
//! - **Dispatcher** (`dispatch::rpc`): health-checks every endpoint, then
//!   sends chunks round-robin and merges partials as they return
//! - **Word-count service**: runs on each worker host, counts one chunk per call
//!
//! # Modules
//!
//! - `protocol`: Message definitions and framing
//! - `node_service`: Remote word-count service
//! - `client`: Dispatcher-side connection and endpoint parsing

pub mod client;
pub mod node_service;
pub mod protocol;

pub use client::{Endpoint, NodeClient};
pub use node_service::{ServiceStats, WordCountService};
pub use protocol::{Message, PROTOCOL_VERSION};
