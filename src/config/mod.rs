//! Configuration module for the chart core.

mod debug;
mod stream;

// Public
pub mod constants;

// Re-export commonly used items
pub use debug::DF;
pub use stream::{BrokerConfig, RestConfig, STREAM, StreamConfig, WsConfig};
