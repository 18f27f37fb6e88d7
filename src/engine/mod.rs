mod core;
mod messages;

pub use core::{BrokerLink, ChartEngine, HistoryStatus};
pub use messages::FeedEvent;
