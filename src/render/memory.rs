use std::collections::HashMap;

use crate::domain::Candle;

use super::{
    BarTint, MarkerSpec, PriceLineId, PriceLineSpec, RenderSurface, ScaleId, ScaleMargins,
    SeriesId, SeriesKind, SeriesPoint, SeriesStyle,
};

/// What a series looks like on the surface right now.
#[derive(Debug, Clone)]
pub struct SeriesRecord {
    pub kind: SeriesKind,
    pub style: SeriesStyle,
    pub candles: Vec<Candle>,
    pub points: Vec<SeriesPoint>,
    pub price_lines: HashMap<PriceLineId, PriceLineSpec>,
}

/// An in-memory `RenderSurface`. Faithful to the contract (best-effort
/// removes, full-replace markers/tints) so hosts can run headless and tests
/// can assert on exactly what the core pushed.
#[derive(Default)]
pub struct MemorySurface {
    next_series: SeriesId,
    next_line: PriceLineId,
    pub series: HashMap<SeriesId, SeriesRecord>,
    pub markers: Vec<MarkerSpec>,
    pub bar_tints: Vec<BarTint>,
    pub margins: HashMap<ScaleId, ScaleMargins>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn price_line_count(&self) -> usize {
        self.series.values().map(|s| s.price_lines.len()).sum()
    }

    /// All price lines on a series, sorted by price. Handy in assertions.
    pub fn price_lines_sorted(&self, series: SeriesId) -> Vec<PriceLineSpec> {
        let mut lines: Vec<PriceLineSpec> = self
            .series
            .get(&series)
            .map(|s| s.price_lines.values().cloned().collect())
            .unwrap_or_default();
        lines.sort_by(|a, b| a.price.total_cmp(&b.price));
        lines
    }
}

impl RenderSurface for MemorySurface {
    fn add_series(&mut self, kind: SeriesKind, style: SeriesStyle) -> SeriesId {
        let id = self.next_series;
        self.next_series += 1;
        self.series.insert(
            id,
            SeriesRecord {
                kind,
                style,
                candles: Vec::new(),
                points: Vec::new(),
                price_lines: HashMap::new(),
            },
        );
        id
    }

    fn set_candles(&mut self, series: SeriesId, candles: Vec<Candle>) {
        if let Some(record) = self.series.get_mut(&series) {
            record.candles = candles;
        }
    }

    fn update_candle(&mut self, series: SeriesId, candle: Candle) {
        if let Some(record) = self.series.get_mut(&series) {
            match record.candles.last_mut() {
                Some(last) if last.time == candle.time => *last = candle,
                _ => record.candles.push(candle),
            }
        }
    }

    fn set_series_data(&mut self, series: SeriesId, points: Vec<SeriesPoint>) {
        if let Some(record) = self.series.get_mut(&series) {
            record.points = points;
        }
    }

    fn update_series_point(&mut self, series: SeriesId, point: SeriesPoint) {
        if let Some(record) = self.series.get_mut(&series) {
            match record.points.last_mut() {
                Some(last) if last.time == point.time => *last = point,
                _ => record.points.push(point),
            }
        }
    }

    fn remove_series(&mut self, series: SeriesId) {
        // Unknown handles are ignored per the trait contract.
        self.series.remove(&series);
    }

    fn create_price_line(&mut self, series: SeriesId, spec: PriceLineSpec) -> PriceLineId {
        let id = self.next_line;
        self.next_line += 1;
        if let Some(record) = self.series.get_mut(&series) {
            record.price_lines.insert(id, spec);
        }
        id
    }

    fn remove_price_line(&mut self, series: SeriesId, line: PriceLineId) {
        if let Some(record) = self.series.get_mut(&series) {
            record.price_lines.remove(&line);
        }
    }

    fn set_markers(&mut self, markers: Vec<MarkerSpec>) {
        self.markers = markers;
    }

    fn set_bar_tints(&mut self, tints: Vec<BarTint>) {
        self.bar_tints = tints;
    }

    fn apply_scale_margins(&mut self, scale: ScaleId, margins: ScaleMargins) {
        self.margins.insert(scale, margins);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_a_discarded_handle_is_a_no_op() {
        let mut surface = MemorySurface::new();
        let series = surface.add_series(SeriesKind::Line, SeriesStyle::line("#fff"));
        surface.remove_series(series);
        surface.remove_series(series); // second remove must not panic
        surface.remove_price_line(series, 42);
        assert_eq!(surface.series_count(), 0);
    }

    #[test]
    fn update_candle_patches_matching_time_and_appends_new() {
        let mut surface = MemorySurface::new();
        let series = surface.add_series(SeriesKind::Candlestick, SeriesStyle::line("#fff"));
        surface.set_candles(series, vec![Candle::new(1_000, 1.0, 2.0, 0.5, 1.5, 0.0)]);

        surface.update_candle(series, Candle::new(1_000, 1.0, 2.5, 0.5, 2.5, 0.0));
        assert_eq!(surface.series[&series].candles.len(), 1);
        assert_eq!(surface.series[&series].candles[0].close, 2.5);

        surface.update_candle(series, Candle::new(2_000, 2.5, 3.0, 2.0, 2.8, 0.0));
        assert_eq!(surface.series[&series].candles.len(), 2);
    }
}
