use std::time::Duration;

/// REST defaults for the dashboard history API.
pub struct RestConfig {
    pub base_url: &'static str,
    pub timeout: Duration,
}

pub struct WsConfig {
    pub base_url: &'static str,
    /// Ping cadence while the server-broadcast socket is open.
    pub heartbeat: Duration,
    pub heartbeat_payload: &'static str,
    /// Fixed delay before re-dialing after a close, while still mounted.
    pub reconnect_delay: Duration,
}

pub struct BrokerConfig {
    /// Instruments are routed broker-direct only when the symbol belongs to
    /// the broker-covered exchanges.
    pub covered_suffixes: &'static [&'static str],
    pub covered_indices: &'static [&'static str],
}

pub struct StreamConfig {
    pub rest: RestConfig,
    pub ws: WsConfig,
    pub broker: BrokerConfig,
}

pub const STREAM: StreamConfig = StreamConfig {
    rest: RestConfig {
        base_url: "http://localhost:8000",
        timeout: Duration::from_millis(8000),
    },
    ws: WsConfig {
        base_url: "ws://localhost:8000/live/ws",
        heartbeat: Duration::from_secs(10),
        heartbeat_payload: "ping",
        reconnect_delay: Duration::from_secs(3),
    },
    broker: BrokerConfig {
        covered_suffixes: &[".NSE", ".BO"],
        covered_indices: &["NIFTY", "SENSEX"],
    },
};
