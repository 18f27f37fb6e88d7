//! Server-broadcast tick channel.
//!
//! Connects to the per-symbol WebSocket endpoint, keeps a fixed-interval
//! heartbeat running while the socket is open, and re-dials after a fixed
//! delay whenever the socket closes, for as long as the chart stays
//! mounted. The heartbeat timer lives inside the connection scope, so it is
//! cleared on every close by construction.

use std::sync::mpsc::Sender;
use std::thread;

use {
    futures::{SinkExt, StreamExt},
    tokio::runtime::Builder,
    tokio::sync::watch,
    tokio::time::sleep,
    tokio_tungstenite::{connect_async, tungstenite::Message},
};

use crate::config::{DF, STREAM};
use crate::domain::Instrument;
use crate::engine::FeedEvent;
use crate::live::{ChannelKind, LiveTick};

/// Spawns the channel on a dedicated thread with its own runtime. Flip the
/// watch sender to true to shut the channel down.
pub fn spawn_server_channel(
    instrument: Instrument,
    events: Sender<FeedEvent>,
    shutdown: watch::Receiver<bool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let rt = match Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(err) => {
                log::error!("server channel runtime failed to start: {err}");
                let _ = events.send(FeedEvent::ChannelClosed(ChannelKind::Server));
                return;
            }
        };
        rt.block_on(run_with_reconnect(instrument, events, shutdown));
    })
}

async fn run_with_reconnect(
    instrument: Instrument,
    events: Sender<FeedEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let url = instrument.channel_url();

    loop {
        let _ = events.send(FeedEvent::ChannelConnecting(ChannelKind::Server));
        if DF.log_live_ticks {
            log::info!("connecting server channel: {url}");
        }

        match connect_async(url.as_str()).await {
            Ok((ws_stream, _)) => {
                let _ = events.send(FeedEvent::ChannelOpen(ChannelKind::Server));
                let closed_by_teardown =
                    run_open_socket(ws_stream, &instrument, &events, &mut shutdown).await;
                let _ = events.send(FeedEvent::ChannelClosed(ChannelKind::Server));
                if closed_by_teardown {
                    return;
                }
            }
            Err(err) => {
                log::error!("server channel connect failed: {err}");
                let _ = events.send(FeedEvent::ChannelClosed(ChannelKind::Server));
            }
        }

        if *shutdown.borrow() {
            return;
        }
        log::warn!(
            "server channel down, reconnecting in {:?}",
            STREAM.ws.reconnect_delay
        );
        tokio::select! {
            _ = sleep(STREAM.ws.reconnect_delay) => {}
            _ = shutdown.changed() => return,
        }
    }
}

/// Runs one open socket until it closes. Returns true when the close came
/// from teardown rather than the peer.
async fn run_open_socket(
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    instrument: &Instrument,
    events: &Sender<FeedEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let (mut write, mut read) = ws_stream.split();
    // The heartbeat only exists while this socket does.
    let mut heartbeat = tokio::time::interval(STREAM.ws.heartbeat);
    heartbeat.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if write
                    .send(Message::Text(STREAM.ws.heartbeat_payload.into()))
                    .await
                    .is_err()
                {
                    return false;
                }
            }
            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                return true;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(tick) = parse_tick(&instrument.symbol, &text) {
                        if DF.log_live_ticks {
                            log::info!("[server-tick] {} -> {:.4}", tick.symbol, tick.price);
                        }
                        let _ = events.send(FeedEvent::Tick(tick));
                    } else {
                        log::warn!("unparseable server channel payload");
                    }
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return false,
                Some(Err(err)) => {
                    log::error!("server channel error: {err}");
                    return false;
                }
                _ => {}
            }
        }
    }
}

/// The broadcast payload is `{price, change, percent_change, volume,
/// timestamp}`. Only `price` is required.
fn parse_tick(symbol: &str, text: &str) -> Option<LiveTick> {
    let v: serde_json::Value = serde_json::from_str(text).ok()?;
    let price = v["price"]
        .as_f64()
        .or_else(|| v["price"].as_str()?.parse().ok())?;
    if !price.is_finite() {
        return None;
    }
    Some(LiveTick {
        symbol: symbol.to_string(),
        price,
        volume: v["volume"].as_f64(),
        time: v["timestamp"].as_i64(),
    })
}
