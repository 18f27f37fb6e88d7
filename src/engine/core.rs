//! The chart engine: the one owner of candle history, indicators,
//! annotations and the live feed for a single mounted chart.
//!
//! All state mutation happens synchronously on this type. Background work
//! (historical fetches, tick channels) reports in through one std mpsc
//! channel which the host drains with `pump` from its update loop.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use {tokio::sync::watch, uuid::Uuid};

use crate::annotations::{AnnotationPainter, AnnotationStore, ToolController, ToolMode};
use crate::config::DF;
use crate::config::constants::palette;
use crate::data::{HistoryLoader, HistoryProvider};
use crate::domain::{Candle, ChartPoint, Geometry, Instrument, sanitize_candles};
use crate::indicators::{IndicatorKind, IndicatorManager, IndicatorParams};
use crate::live::{
    BrokerSession, BrokerTickSource, ChannelKind, ChannelStatus, ConnectionState, LiveTick,
    select_channel, spawn_broker_channel, spawn_server_channel,
};
use crate::render::{
    RenderSurface, ScaleId, SeriesId, SeriesKind, SeriesPoint, SeriesStyle,
};

use super::messages::FeedEvent;

/// An authenticated broker session plus a way to open its data socket.
/// Present only when the host actually has a usable broker client.
pub struct BrokerLink {
    pub session: BrokerSession,
    pub source_factory: Box<dyn Fn() -> Box<dyn BrokerTickSource> + Send>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStatus {
    Idle,
    Loading,
    Ready,
    /// The last fetch failed; the previous good candles are still shown.
    Error,
}

pub struct ChartEngine<S: RenderSurface> {
    surface: S,
    broker: Option<BrokerLink>,

    instrument: Instrument,
    candles: Vec<Candle>,
    history_status: HistoryStatus,

    main_series: SeriesId,
    volume_series: SeriesId,

    indicators: IndicatorManager,
    store: AnnotationStore,
    painter: AnnotationPainter,
    tools: ToolController,

    connection: ConnectionState,
    loader: HistoryLoader,
    events_tx: Sender<FeedEvent>,
    events_rx: Receiver<FeedEvent>,
    channel_shutdown: Option<watch::Sender<bool>>,

    mounted: bool,
}

impl<S: RenderSurface> ChartEngine<S> {
    /// Builds a passive engine: series exist on the surface but nothing is
    /// fetched or connected until `mount`.
    pub fn new(
        mut surface: S,
        provider: Arc<dyn HistoryProvider>,
        broker: Option<BrokerLink>,
        instrument: Instrument,
    ) -> Self {
        let main_series = surface.add_series(
            SeriesKind::Candlestick,
            SeriesStyle::line(palette::CANDLE_UP),
        );
        let volume_series = surface.add_series(
            SeriesKind::Histogram,
            SeriesStyle::line(palette::VOLUME).on_scale(ScaleId::Volume),
        );

        let (events_tx, events_rx) = channel();
        ChartEngine {
            surface,
            broker,
            instrument,
            candles: Vec::new(),
            history_status: HistoryStatus::Idle,
            main_series,
            volume_series,
            indicators: IndicatorManager::new(main_series),
            store: AnnotationStore::new(),
            painter: AnnotationPainter::new(main_series),
            tools: ToolController::new(main_series),
            connection: ConnectionState::disconnected(),
            loader: HistoryLoader::new(provider),
            events_tx,
            events_rx,
            channel_shutdown: None,
            mounted: false,
        }
    }

    /// Kicks off the first historical load and opens the tick channel.
    pub fn mount(&mut self) {
        self.mounted = true;
        self.refresh_history();
        self.open_channel();
    }

    /// Switches symbol/timeframe: tears the old channel down fully, releases
    /// all drawing and indicator artifacts, then starts over for the new
    /// instrument.
    pub fn set_instrument(&mut self, instrument: Instrument) {
        if instrument == self.instrument {
            return;
        }
        self.close_channel();
        self.release_artifacts();

        // Old candles go now: a tick for the new symbol must not patch a bar
        // from the old one, and an empty array makes early ticks no-ops.
        self.candles.clear();
        self.surface.set_candles(self.main_series, Vec::new());
        self.surface.set_series_data(self.volume_series, Vec::new());

        self.instrument = instrument;
        if self.mounted {
            self.refresh_history();
            self.open_channel();
        }
    }

    /// Drains pending feed events. Call once per host frame. Returns how
    /// many events were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    // --- pointer input -----------------------------------------------------

    pub fn set_tool(&mut self, mode: ToolMode) {
        self.tools.set_mode(&mut self.surface, mode);
    }

    pub fn tool(&self) -> ToolMode {
        self.tools.mode()
    }

    /// A surface click, already resolved to chart coordinates (or None when
    /// it missed the plotted area).
    pub fn on_click(&mut self, point: Option<ChartPoint>) {
        if self
            .tools
            .handle_click(&mut self.surface, &mut self.store, point)
        {
            self.painter.repaint(&mut self.surface, &self.store);
        }
    }

    pub fn on_crosshair_move(&mut self, point: Option<ChartPoint>) {
        self.tools.handle_crosshair_move(&mut self.surface, point);
    }

    // --- annotations -------------------------------------------------------

    pub fn edit_drawing(&mut self, id: Uuid, geometry: Geometry) -> bool {
        let edited = self.store.edit(id, geometry);
        if edited {
            self.painter.repaint(&mut self.surface, &self.store);
        }
        edited
    }

    pub fn delete_drawing(&mut self, id: Uuid) -> bool {
        let deleted = self.store.delete(id);
        if deleted {
            self.painter.repaint(&mut self.surface, &self.store);
        }
        deleted
    }

    pub fn undo_drawing(&mut self) {
        if self.store.undo().is_some() {
            self.painter.repaint(&mut self.surface, &self.store);
        }
    }

    pub fn clear_drawings(&mut self) {
        self.store.clear();
        self.painter.repaint(&mut self.surface, &self.store);
    }

    pub fn drawings(&self) -> &AnnotationStore {
        &self.store
    }

    // --- indicators --------------------------------------------------------

    pub fn add_indicator(
        &mut self,
        kind: IndicatorKind,
        params: IndicatorParams,
    ) -> anyhow::Result<Uuid> {
        self.indicators
            .add(&mut self.surface, &self.candles, kind, params)
    }

    pub fn remove_indicator(&mut self, id: Uuid) {
        self.indicators.remove(&mut self.surface, id);
    }

    pub fn indicators(&self) -> &IndicatorManager {
        &self.indicators
    }

    // --- state accessors ---------------------------------------------------

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.history_status
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Unmount. Order matters: stop the tick channel (which kills its
    /// heartbeat and reconnect timers), outdate any in-flight fetch, then
    /// release every renderer handle.
    pub fn teardown(&mut self) {
        self.close_channel();
        self.loader.cancel();
        self.release_artifacts();
        self.surface.remove_series(self.volume_series);
        self.surface.remove_series(self.main_series);
        self.candles.clear();
        self.history_status = HistoryStatus::Idle;
        self.mounted = false;
    }

    // --- internals ---------------------------------------------------------

    fn refresh_history(&mut self) {
        self.history_status = HistoryStatus::Loading;
        self.loader
            .request(self.instrument.clone(), self.events_tx.clone());
    }

    fn open_channel(&mut self) {
        let kind = select_channel(
            self.broker.as_ref().map(|b| &b.session),
            self.broker.is_some(),
            &self.instrument,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        match kind {
            ChannelKind::Broker => {
                let link = self.broker.as_ref().expect("selection requires a link");
                spawn_broker_channel(
                    (link.source_factory)(),
                    link.session.clone(),
                    self.instrument.clone(),
                    self.events_tx.clone(),
                    shutdown_rx,
                );
            }
            ChannelKind::Server | ChannelKind::None => {
                spawn_server_channel(
                    self.instrument.clone(),
                    self.events_tx.clone(),
                    shutdown_rx,
                );
            }
        }

        self.channel_shutdown = Some(shutdown_tx);
        self.connection = ConnectionState {
            channel: match kind {
                ChannelKind::Broker => ChannelKind::Broker,
                _ => ChannelKind::Server,
            },
            status: ChannelStatus::Connecting,
        };
    }

    fn close_channel(&mut self) {
        if let Some(shutdown) = self.channel_shutdown.take() {
            let _ = shutdown.send(true);
        }
        self.connection = ConnectionState::disconnected();
    }

    /// Releases every renderer handle owned by indicators and drawings.
    fn release_artifacts(&mut self) {
        self.tools.set_mode(&mut self.surface, ToolMode::Cursor);
        self.painter.clear(&mut self.surface);
        self.store.clear();
        self.indicators.release_all(&mut self.surface);
    }

    fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::History { generation, result } => {
                if generation != self.loader.generation() {
                    // A cancelled fetch must never update state.
                    if DF.log_history_loads {
                        log::debug!("discarding stale history generation {generation}");
                    }
                    return;
                }
                match result {
                    Ok(raw) => self.apply_history(raw),
                    Err(err) => {
                        // Keep the last good candles on screen.
                        log::error!("history load for {} failed: {err}", self.instrument);
                        self.history_status = HistoryStatus::Error;
                    }
                }
            }
            FeedEvent::Tick(tick) => self.apply_tick(tick),
            FeedEvent::ChannelConnecting(kind) => {
                self.connection = ConnectionState {
                    channel: kind,
                    status: ChannelStatus::Connecting,
                };
            }
            FeedEvent::ChannelOpen(kind) => {
                self.connection = ConnectionState {
                    channel: kind,
                    status: ChannelStatus::Open,
                };
            }
            FeedEvent::ChannelClosed(kind) => {
                if self.connection.channel == kind {
                    self.connection.status = ChannelStatus::Closed;
                }
            }
        }
    }

    fn apply_history(&mut self, raw: Vec<Candle>) {
        let (clean, dropped) = sanitize_candles(raw);
        if dropped > 0 {
            log::warn!("dropped {dropped} invalid candles for {}", self.instrument);
        }
        if clean.is_empty() {
            log::error!("history for {} came back empty", self.instrument);
            self.history_status = HistoryStatus::Error;
            return;
        }

        self.surface.set_candles(self.main_series, clean.clone());
        self.surface.set_series_data(
            self.volume_series,
            clean
                .iter()
                .map(|c| SeriesPoint {
                    time: c.time,
                    value: c.volume,
                })
                .collect(),
        );
        self.candles = clean;
        self.history_status = HistoryStatus::Ready;

        // Derived layers re-run against the fresh array.
        self.indicators
            .recompute_all(&mut self.surface, &self.candles);
        self.painter.repaint(&mut self.surface, &self.store);

        if DF.log_history_loads {
            let last = self.candles.last().map(|c| c.time).unwrap_or_default();
            log::info!(
                "history ready: {} candles for {} (last bar {})",
                self.candles.len(),
                self.instrument,
                crate::utils::epoch_ms_to_utc(last)
            );
        }
    }

    /// The last-candle patch rule. Ticks arriving before the first load, or
    /// tagged with a different symbol (a late event from a torn-down
    /// channel), are dropped.
    fn apply_tick(&mut self, tick: LiveTick) {
        if tick.symbol != self.instrument.symbol {
            return;
        }
        let Some(last) = self.candles.last_mut() else {
            return;
        };

        last.apply_tick(tick.price);
        if let Some(volume) = tick.volume {
            last.volume = volume;
        }
        let last = *last;

        self.surface.update_candle(self.main_series, last);
        self.surface.update_series_point(
            self.volume_series,
            SeriesPoint {
                time: last.time,
                value: last.volume,
            },
        );
        if DF.log_live_ticks {
            log::debug!("tick {} -> {:.4}", tick.symbol, tick.price);
        }
    }
}

impl<S: RenderSurface> Drop for ChartEngine<S> {
    fn drop(&mut self) {
        // Best effort: make sure background tasks stop with the engine.
        self.close_channel();
    }
}
