//! The rendering surface boundary.
//!
//! The pixel-producing chart widget is an external collaborator. This module
//! defines the primitive vocabulary the core drives it through, plus an
//! in-memory implementation used by headless hosts and the test suite.
//!
//! Pointer resolution (pixel -> price/time) stays on the host side; the core
//! only ever sees already-resolved `ChartPoint`s.

pub mod memory;

pub use memory::MemorySurface;

use crate::domain::Candle;

pub type SeriesId = u64;
pub type PriceLineId = u64;

/// A price-scale region. Oscillator panes are allocated dynamically and
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleId {
    Price,
    Volume,
    Pane(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMargins {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Candlestick,
    Line,
    Histogram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub color: String,
    pub line_width: u32,
    pub line_style: LineStyle,
    pub scale: ScaleId,
}

impl SeriesStyle {
    pub fn line(color: &str) -> Self {
        SeriesStyle {
            color: color.to_string(),
            line_width: 2,
            line_style: LineStyle::Solid,
            scale: ScaleId::Price,
        }
    }

    pub fn on_scale(mut self, scale: ScaleId) -> Self {
        self.scale = scale;
        self
    }

    pub fn width(mut self, line_width: u32) -> Self {
        self.line_width = line_width;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub time: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceLineSpec {
    pub price: f64,
    pub color: String,
    pub line_width: u32,
    pub line_style: LineStyle,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub time: i64,
    pub position: MarkerPosition,
    pub shape: MarkerShape,
    pub color: String,
    pub text: String,
}

/// A per-candle color override, keyed by candle time.
#[derive(Debug, Clone, PartialEq)]
pub struct BarTint {
    pub time: i64,
    pub color: String,
}

/// Primitive surface operations the chart core drives.
///
/// Removal calls are best-effort by contract: passing a handle the surface
/// has already discarded must be silently ignored, never an error. That is
/// why nothing here returns `Result`.
pub trait RenderSurface {
    fn add_series(&mut self, kind: SeriesKind, style: SeriesStyle) -> SeriesId;
    fn set_candles(&mut self, series: SeriesId, candles: Vec<Candle>);
    /// Patch or append the trailing bar without resending history.
    fn update_candle(&mut self, series: SeriesId, candle: Candle);
    fn set_series_data(&mut self, series: SeriesId, points: Vec<SeriesPoint>);
    /// Patch or append the trailing point of a line/histogram series.
    fn update_series_point(&mut self, series: SeriesId, point: SeriesPoint);
    fn remove_series(&mut self, series: SeriesId);

    fn create_price_line(&mut self, series: SeriesId, spec: PriceLineSpec) -> PriceLineId;
    fn remove_price_line(&mut self, series: SeriesId, line: PriceLineId);

    /// Replaces the full marker set. An empty vec clears markers.
    fn set_markers(&mut self, markers: Vec<MarkerSpec>);
    /// Replaces all per-candle color overrides. An empty vec resets bars to
    /// their default up/down coloring.
    fn set_bar_tints(&mut self, tints: Vec<BarTint>);

    fn apply_scale_margins(&mut self, scale: ScaleId, margins: ScaleMargins);
}
