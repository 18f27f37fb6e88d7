//! Live price synchronization.
//!
//! Exactly one tick channel is open per mounted chart: broker-direct when a
//! broker session covers the instrument, otherwise the server-broadcast
//! WebSocket. Both run as isolated background tasks and report back through
//! the engine's single event channel; the only thing a tick can do is patch
//! the last candle.

mod broker;
mod server;

pub use broker::{BrokerTickSource, spawn_broker_channel};
pub use server::spawn_server_channel;

use serde::{Deserialize, Serialize};

use crate::domain::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Broker,
    Server,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    Closed,
}

/// The single owned connection value. Transitioned only by connect, tick,
/// close and teardown events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub channel: ChannelKind,
    pub status: ChannelStatus,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        ConnectionState {
            channel: ChannelKind::None,
            status: ChannelStatus::Closed,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == ChannelStatus::Open
    }
}

/// An authenticated broker session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSession {
    pub access_token: String,
}

/// One price update from either channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTick {
    pub symbol: String,
    pub price: f64,
    pub volume: Option<f64>,
    pub time: Option<i64>,
}

/// Channel policy, evaluated once per symbol/mount: broker-direct needs an
/// authenticated session, a broker-covered instrument and an available
/// broker client, in that order. Anything else falls back to the server
/// broadcast.
pub fn select_channel(
    session: Option<&BrokerSession>,
    broker_available: bool,
    instrument: &Instrument,
) -> ChannelKind {
    match session {
        Some(_) if instrument.is_broker_covered() && broker_available => ChannelKind::Broker,
        _ => ChannelKind::Server,
    }
}
