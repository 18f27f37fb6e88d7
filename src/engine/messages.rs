use crate::domain::Candle;
use crate::live::{ChannelKind, LiveTick};

/// Everything the background tasks can tell the engine. Delivered over one
/// std mpsc channel and drained synchronously by `ChartEngine::pump`.
#[derive(Debug)]
pub enum FeedEvent {
    /// A historical fetch finished. `generation` identifies the request;
    /// stale generations are discarded without touching state.
    History {
        generation: u64,
        result: Result<Vec<Candle>, String>,
    },
    Tick(LiveTick),
    ChannelConnecting(ChannelKind),
    ChannelOpen(ChannelKind),
    ChannelClosed(ChannelKind),
}
