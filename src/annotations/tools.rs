//! The drawing-tool state machine.
//!
//! Pointer input arrives already resolved to chart coordinates; anything
//! that missed the plotted area arrives as `None` and is silently dropped.
//! Single-click tools commit immediately. Multi-click tools accumulate
//! pending points and show a transient preview that is fully torn down and
//! rebuilt on every crosshair move.

use {
    serde::{Deserialize, Serialize},
    strum_macros::{Display, EnumIter},
};

use crate::config::DF;
use crate::config::constants::palette;
use crate::domain::{ChartPoint, Drawing, DrawingKind, LevelPrecision, fib_levels};
use crate::render::{
    LineStyle, PriceLineId, PriceLineSpec, RenderSurface, SeriesId, SeriesKind, SeriesPoint,
    SeriesStyle,
};

use super::AnnotationStore;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Default,
)]
pub enum ToolMode {
    #[default]
    Cursor,
    Horizontal,
    Rect,
    TrendLine,
    Fibonacci,
    LongShort,
}

impl ToolMode {
    /// Clicks needed before a commit. Zero means the first click commits.
    fn required_points(&self) -> usize {
        match self {
            ToolMode::Cursor | ToolMode::Horizontal | ToolMode::Rect => 0,
            ToolMode::TrendLine | ToolMode::Fibonacci => 2,
            ToolMode::LongShort => 3,
        }
    }
}

pub struct ToolController {
    main_series: SeriesId,
    mode: ToolMode,
    pending: Vec<ChartPoint>,
    preview_series: Vec<SeriesId>,
    preview_lines: Vec<PriceLineId>,
}

impl ToolController {
    pub fn new(main_series: SeriesId) -> Self {
        ToolController {
            main_series,
            mode: ToolMode::Cursor,
            pending: Vec::new(),
            preview_series: Vec::new(),
            preview_lines: Vec::new(),
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn pending(&self) -> &[ChartPoint] {
        &self.pending
    }

    /// Switching to Cursor abandons the capture in progress. Switching
    /// between tools deliberately does not: commit always resets to Cursor,
    /// so leftover points only exist when a capture was abandoned mid-way,
    /// and the next tool starts by overwriting them.
    pub fn set_mode<S: RenderSurface>(&mut self, surface: &mut S, mode: ToolMode) {
        if mode == ToolMode::Cursor {
            self.pending.clear();
            self.clear_preview(surface);
        }
        self.mode = mode;
    }

    /// Returns true when a drawing was committed and the caller should
    /// repaint the annotation layer.
    pub fn handle_click<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        store: &mut AnnotationStore,
        point: Option<ChartPoint>,
    ) -> bool {
        if self.mode == ToolMode::Cursor {
            return false;
        }
        // A click outside the plotted area resolves to nothing: no-op.
        let Some(point) = point else {
            return false;
        };

        match self.mode {
            ToolMode::Horizontal => {
                store.add(Drawing::level(DrawingKind::Horizontal, point.price));
                self.set_mode(surface, ToolMode::Cursor);
                true
            }
            // Rect stays armed: zones are usually drawn in batches, so the
            // tool does not reset to Cursor after a commit.
            ToolMode::Rect => {
                store.add(Drawing::level(DrawingKind::Rect, point.price));
                true
            }
            mode => {
                // A second trendline point on the anchor's timestamp would
                // commit a zero-width series; treat it like a missed click.
                if mode == ToolMode::TrendLine
                    && self.pending.iter().any(|p| p.time == point.time)
                {
                    return false;
                }
                self.pending.push(point);
                if DF.log_drawing_tools {
                    log::debug!("{mode}: captured point {}/{}", self.pending.len(), mode.required_points());
                }
                if self.pending.len() < mode.required_points() {
                    return false;
                }
                let points = std::mem::take(&mut self.pending);
                self.clear_preview(surface);
                store.add(Drawing::from_points(commit_kind(mode), points));
                self.mode = ToolMode::Cursor;
                true
            }
        }
    }

    /// Rebuilds the preview against the current hover point. Hovering the
    /// exact timestamp of the first pending point is skipped: a zero-width
    /// series would corrupt the preview renderer.
    pub fn handle_crosshair_move<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        point: Option<ChartPoint>,
    ) {
        if self.mode == ToolMode::Cursor || self.pending.is_empty() {
            return;
        }
        let Some(hover) = point else {
            return;
        };
        let anchor = self.pending[0];
        if hover.time == anchor.time {
            return;
        }

        self.clear_preview(surface);
        match self.mode {
            ToolMode::TrendLine => {
                let mut points = vec![anchor, hover];
                points.sort_by_key(|p| p.time);
                let id = surface.add_series(
                    SeriesKind::Line,
                    SeriesStyle::line(palette::PREVIEW).width(1),
                );
                surface.set_series_data(
                    id,
                    points
                        .iter()
                        .map(|p| SeriesPoint {
                            time: p.time,
                            value: p.price,
                        })
                        .collect(),
                );
                self.preview_series.push(id);
            }
            ToolMode::Fibonacci => {
                for level in fib_levels(anchor.price, hover.price, LevelPrecision::Guide) {
                    self.preview_line(surface, level.price, format!("{}", level.ratio));
                }
            }
            ToolMode::LongShort => {
                // Entry is locked by the first click; target follows the
                // cursor. The stop only appears on commit.
                self.preview_line(surface, anchor.price, "ENTRY".to_string());
                self.preview_line(surface, hover.price, "TARGET".to_string());
            }
            ToolMode::Cursor | ToolMode::Horizontal | ToolMode::Rect => {}
        }
    }

    /// Removes all preview artifacts. Every redraw goes through here first,
    /// so previews never accumulate.
    pub fn clear_preview<S: RenderSurface>(&mut self, surface: &mut S) {
        for series in self.preview_series.drain(..) {
            surface.remove_series(series);
        }
        for line in self.preview_lines.drain(..) {
            surface.remove_price_line(self.main_series, line);
        }
    }

    fn preview_line<S: RenderSurface>(&mut self, surface: &mut S, price: f64, title: String) {
        let id = surface.create_price_line(
            self.main_series,
            PriceLineSpec {
                price,
                color: palette::PREVIEW.to_string(),
                line_width: 1,
                line_style: LineStyle::Dotted,
                title,
            },
        );
        self.preview_lines.push(id);
    }
}

fn commit_kind(mode: ToolMode) -> DrawingKind {
    match mode {
        ToolMode::Horizontal => DrawingKind::Horizontal,
        ToolMode::Rect => DrawingKind::Rect,
        ToolMode::TrendLine => DrawingKind::TrendLine,
        ToolMode::Fibonacci => DrawingKind::Fibonacci,
        ToolMode::LongShort => DrawingKind::LongShort,
        ToolMode::Cursor => unreachable!("cursor never commits"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Geometry;
    use crate::render::MemorySurface;

    fn setup() -> (MemorySurface, ToolController, AnnotationStore) {
        let mut surface = MemorySurface::new();
        let main = surface.add_series(SeriesKind::Candlestick, SeriesStyle::line("#fff"));
        (surface, ToolController::new(main), AnnotationStore::new())
    }

    fn at(time: i64, price: f64) -> Option<ChartPoint> {
        Some(ChartPoint { time, price })
    }

    #[test]
    fn cursor_and_missed_clicks_are_no_ops() {
        let (mut surface, mut tools, mut store) = setup();
        assert!(!tools.handle_click(&mut surface, &mut store, at(1_000, 50.0)));

        tools.set_mode(&mut surface, ToolMode::Horizontal);
        assert!(!tools.handle_click(&mut surface, &mut store, None));
        assert!(store.is_empty());
    }

    #[test]
    fn horizontal_commits_once_and_returns_to_cursor() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::Horizontal);

        assert!(tools.handle_click(&mut surface, &mut store, at(1_000, 50.0)));
        assert_eq!(store.len(), 1);
        assert_eq!(tools.mode(), ToolMode::Cursor);
    }

    #[test]
    fn rect_stays_armed_for_consecutive_zones() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::Rect);

        assert!(tools.handle_click(&mut surface, &mut store, at(1_000, 50.0)));
        assert!(tools.handle_click(&mut surface, &mut store, at(2_000, 60.0)));
        assert_eq!(store.len(), 2);
        assert_eq!(tools.mode(), ToolMode::Rect, "rect does not reset to cursor");
    }

    #[test]
    fn trendline_commits_on_second_click() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::TrendLine);

        assert!(!tools.handle_click(&mut surface, &mut store, at(2_000, 70.0)));
        assert!(tools.handle_click(&mut surface, &mut store, at(1_000, 50.0)));

        assert_eq!(tools.mode(), ToolMode::Cursor);
        let drawing = store.iter().next().unwrap();
        match &drawing.geometry {
            Geometry::Points(points) => assert_eq!(points.len(), 2),
            other => panic!("unexpected geometry {other:?}"),
        }
        // Click order is preserved in storage; sorting happens at render.
        let sorted = drawing.points_time_sorted();
        assert!(sorted[0].time < sorted[1].time);
    }

    #[test]
    fn long_short_needs_three_clicks() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::LongShort);

        assert!(!tools.handle_click(&mut surface, &mut store, at(1_000, 100.0)));
        assert!(!tools.handle_click(&mut surface, &mut store, at(2_000, 90.0)));
        assert!(tools.handle_click(&mut surface, &mut store, at(3_000, 130.0)));

        let drawing = store.iter().next().unwrap();
        match &drawing.geometry {
            Geometry::Points(points) => {
                assert_eq!(points.len(), 3);
                assert_eq!(points[0].price, 100.0, "entry keeps click order");
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn preview_rebuilds_without_accumulating() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::TrendLine);
        tools.handle_click(&mut surface, &mut store, at(1_000, 50.0));

        tools.handle_crosshair_move(&mut surface, at(2_000, 60.0));
        tools.handle_crosshair_move(&mut surface, at(3_000, 65.0));
        tools.handle_crosshair_move(&mut surface, at(4_000, 70.0));

        // main candle series + exactly one preview series
        assert_eq!(surface.series_count(), 2);
    }

    #[test]
    fn hovering_the_anchor_timestamp_is_guarded() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::TrendLine);
        tools.handle_click(&mut surface, &mut store, at(1_000, 50.0));

        tools.handle_crosshair_move(&mut surface, at(1_000, 99.0));
        assert_eq!(surface.series_count(), 1, "no zero-width preview series");
    }

    #[test]
    fn fibonacci_preview_shows_three_guides_commit_clears_them() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::Fibonacci);
        tools.handle_click(&mut surface, &mut store, at(1_000, 50.0));

        tools.handle_crosshair_move(&mut surface, at(2_000, 70.0));
        assert_eq!(surface.price_line_count(), 3);

        assert!(tools.handle_click(&mut surface, &mut store, at(2_000, 70.0)));
        assert_eq!(surface.price_line_count(), 0, "preview gone after commit");
        assert_eq!(store.len(), 1);

        let drawing = store.iter().next().unwrap();
        let points = drawing.points_time_sorted();
        assert_eq!(points.len(), 2);
        assert!(points[0].time < points[1].time);
    }

    #[test]
    fn switching_to_cursor_discards_capture_and_preview() {
        let (mut surface, mut tools, mut store) = setup();
        tools.set_mode(&mut surface, ToolMode::LongShort);
        tools.handle_click(&mut surface, &mut store, at(1_000, 100.0));
        tools.handle_crosshair_move(&mut surface, at(2_000, 110.0));
        assert!(surface.price_line_count() > 0);

        tools.set_mode(&mut surface, ToolMode::Cursor);
        assert!(tools.pending().is_empty());
        assert_eq!(surface.price_line_count(), 0);
        assert!(store.is_empty());
    }
}
