//! Broker-direct tick channel.
//!
//! Subscribes the mapped instrument id on an authenticated broker data
//! socket and forwards last-traded-price ticks. Unlike the server channel
//! there is no automatic reconnect here: when the broker side drops, the
//! channel logs the gap and stays closed until the next symbol change or
//! remount.

use std::sync::mpsc::Sender;
use std::thread;

use {anyhow::Result, async_trait::async_trait, tokio::runtime::Builder, tokio::sync::watch};

use crate::config::DF;
use crate::domain::Instrument;
use crate::engine::FeedEvent;
use crate::live::{BrokerSession, ChannelKind, LiveTick};

/// The broker's streaming client, behind a trait so hosts can plug in the
/// real SDK session.
#[async_trait]
pub trait BrokerTickSource: Send {
    async fn connect(&mut self, access_token: &str) -> Result<()>;
    async fn subscribe(&mut self, instrument_id: &str) -> Result<()>;
    /// The next last-traded-price. `None` once the peer closes the stream.
    async fn next_tick(&mut self) -> Option<f64>;
    async fn close(&mut self);
}

pub fn spawn_broker_channel(
    source: Box<dyn BrokerTickSource>,
    session: BrokerSession,
    instrument: Instrument,
    events: Sender<FeedEvent>,
    shutdown: watch::Receiver<bool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let rt = match Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(err) => {
                log::error!("broker channel runtime failed to start: {err}");
                let _ = events.send(FeedEvent::ChannelClosed(ChannelKind::Broker));
                return;
            }
        };
        rt.block_on(run_channel(source, session, instrument, events, shutdown));
    })
}

async fn run_channel(
    mut source: Box<dyn BrokerTickSource>,
    session: BrokerSession,
    instrument: Instrument,
    events: Sender<FeedEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let _ = events.send(FeedEvent::ChannelConnecting(ChannelKind::Broker));

    if let Err(err) = source.connect(&session.access_token).await {
        log::error!("broker connect failed: {err:#}");
        let _ = events.send(FeedEvent::ChannelClosed(ChannelKind::Broker));
        return;
    }
    let broker_id = instrument.broker_id();
    if let Err(err) = source.subscribe(&broker_id).await {
        log::error!("broker subscribe {broker_id} failed: {err:#}");
        source.close().await;
        let _ = events.send(FeedEvent::ChannelClosed(ChannelKind::Broker));
        return;
    }

    let _ = events.send(FeedEvent::ChannelOpen(ChannelKind::Broker));
    if DF.log_live_ticks {
        log::info!("broker channel open for {broker_id}");
    }

    loop {
        tokio::select! {
            tick = source.next_tick() => match tick {
                Some(price) if price.is_finite() => {
                    let _ = events.send(FeedEvent::Tick(LiveTick {
                        symbol: instrument.symbol.clone(),
                        price,
                        volume: None,
                        time: None,
                    }));
                }
                Some(_) => {} // non-finite prices are dropped
                None => {
                    // No recovery path is defined for a broker-side drop.
                    log::warn!("broker channel closed by peer; no automatic reconnect");
                    break;
                }
            },
            _ = shutdown.changed() => {
                source.close().await;
                break;
            }
        }
    }

    let _ = events.send(FeedEvent::ChannelClosed(ChannelKind::Broker));
}
