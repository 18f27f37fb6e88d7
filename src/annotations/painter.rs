//! Renders the committed annotation list onto the surface.
//!
//! Rebuilds are total: every artifact the painter created is removed, then
//! the whole store is redrawn in insertion order. Redundant calls are safe,
//! which keeps the store free of any renderer knowledge.

use crate::config::constants::{palette, rect};
use crate::domain::{Drawing, DrawingKind, Geometry, LevelPrecision, fib_levels, risk_reward};
use crate::render::{
    LineStyle, PriceLineId, PriceLineSpec, RenderSurface, SeriesId, SeriesKind, SeriesPoint,
    SeriesStyle,
};

use super::AnnotationStore;

pub struct AnnotationPainter {
    /// The candle series drawings hang their price lines off.
    main_series: SeriesId,
    series: Vec<SeriesId>,
    lines: Vec<PriceLineId>,
}

impl AnnotationPainter {
    pub fn new(main_series: SeriesId) -> Self {
        AnnotationPainter {
            main_series,
            series: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Full rebuild: remove everything, then redraw the current store.
    pub fn repaint<S: RenderSurface>(&mut self, surface: &mut S, store: &AnnotationStore) {
        self.clear(surface);
        for drawing in store.iter() {
            self.paint(surface, drawing);
        }
    }

    /// Removes every artifact this painter ever created. Safe against
    /// handles the surface already discarded.
    pub fn clear<S: RenderSurface>(&mut self, surface: &mut S) {
        for series in self.series.drain(..) {
            surface.remove_series(series);
        }
        for line in self.lines.drain(..) {
            surface.remove_price_line(self.main_series, line);
        }
    }

    fn paint<S: RenderSurface>(&mut self, surface: &mut S, drawing: &Drawing) {
        match (&drawing.kind, &drawing.geometry) {
            (DrawingKind::Horizontal, Geometry::Level { price }) => {
                self.price_line(
                    surface,
                    *price,
                    palette::HORIZONTAL,
                    2,
                    LineStyle::Solid,
                    String::new(),
                );
            }
            (DrawingKind::Rect, Geometry::Level { price }) => {
                let half = price * rect::BAND_PCT / 2.0;
                for edge in [price + half, price - half] {
                    self.price_line(
                        surface,
                        edge,
                        palette::RECT_EDGE,
                        1,
                        LineStyle::Dashed,
                        String::new(),
                    );
                }
            }
            (DrawingKind::TrendLine, Geometry::Points(_)) => {
                let points = drawing.points_time_sorted();
                let id = surface.add_series(
                    SeriesKind::Line,
                    SeriesStyle::line(palette::TRENDLINE).width(2),
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
                self.series.push(id);
            }
            (DrawingKind::Fibonacci, Geometry::Points(_)) => {
                let points = drawing.points_time_sorted();
                if points.len() < 2 {
                    return;
                }
                for level in fib_levels(points[0].price, points[1].price, LevelPrecision::Full) {
                    let (color, width) = fib_style(level.ratio);
                    self.price_line(
                        surface,
                        level.price,
                        color,
                        width,
                        LineStyle::Solid,
                        format!("{}", level.ratio),
                    );
                }
            }
            (DrawingKind::LongShort, Geometry::Points(points)) => {
                // Roles come from click order: entry, stop, target.
                if points.len() < 3 {
                    return;
                }
                let (entry, stop, target) = (points[0].price, points[1].price, points[2].price);
                let ratio_label = match risk_reward(entry, stop, target) {
                    Some(ratio) => format!("TARGET (R/R: {ratio:.2})"),
                    None => "TARGET".to_string(),
                };
                self.price_line(
                    surface,
                    entry,
                    palette::ENTRY,
                    2,
                    LineStyle::Solid,
                    "ENTRY".to_string(),
                );
                self.price_line(
                    surface,
                    stop,
                    palette::STOP,
                    2,
                    LineStyle::Solid,
                    "STOP".to_string(),
                );
                self.price_line(surface, target, palette::TARGET, 2, LineStyle::Solid, ratio_label);
            }
            // A kind/geometry mismatch can only come from a bad edit; skip it
            // rather than panic mid-render.
            _ => {
                log::warn!(
                    "skipping {} drawing with mismatched geometry",
                    drawing.kind
                );
            }
        }
    }

    fn price_line<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        price: f64,
        color: &str,
        line_width: u32,
        line_style: LineStyle,
        title: String,
    ) {
        let id = surface.create_price_line(
            self.main_series,
            PriceLineSpec {
                price,
                color: color.to_string(),
                line_width,
                line_style,
                title,
            },
        );
        self.lines.push(id);
    }
}

fn fib_style(ratio: f64) -> (&'static str, u32) {
    if ratio == 0.0 || ratio == 1.0 {
        (palette::FIB_OUTER, 2)
    } else if ratio == 0.5 {
        (palette::FIB_MID, 1)
    } else {
        (palette::FIB_INNER, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChartPoint, Drawing};
    use crate::render::MemorySurface;

    fn setup() -> (MemorySurface, AnnotationPainter, AnnotationStore) {
        let mut surface = MemorySurface::new();
        let main = surface.add_series(SeriesKind::Candlestick, SeriesStyle::line("#fff"));
        (surface, AnnotationPainter::new(main), AnnotationStore::new())
    }

    #[test]
    fn fibonacci_commit_renders_five_levels() {
        let (mut surface, mut painter, mut store) = setup();
        store.add(Drawing::from_points(
            DrawingKind::Fibonacci,
            vec![
                ChartPoint {
                    time: 2_000,
                    price: 70.0,
                },
                ChartPoint {
                    time: 1_000,
                    price: 50.0,
                },
            ],
        ));

        painter.repaint(&mut surface, &store);

        let lines = painter
            .lines
            .iter()
            .map(|&id| surface.series[&painter.main_series].price_lines[&id].price)
            .collect::<Vec<_>>();
        let mut sorted = lines.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(sorted.len(), 5);
        for (got, want) in sorted.iter().zip([50.0, 57.64, 60.0, 62.36, 70.0]) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }

    #[test]
    fn long_short_commit_renders_three_lines_with_ratio() {
        let (mut surface, mut painter, mut store) = setup();
        store.add(Drawing::from_points(
            DrawingKind::LongShort,
            vec![
                ChartPoint {
                    time: 1_000,
                    price: 100.0,
                }, // entry
                ChartPoint {
                    time: 2_000,
                    price: 90.0,
                }, // stop
                ChartPoint {
                    time: 3_000,
                    price: 130.0,
                }, // target
            ],
        ));

        painter.repaint(&mut surface, &store);

        let lines = surface.price_lines_sorted(painter.main_series);
        assert_eq!(lines.len(), 3);
        let target = lines.iter().find(|l| l.price == 130.0).unwrap();
        assert!(target.title.contains("3.00"), "title was {}", target.title);
    }

    #[test]
    fn repaint_is_idempotent_and_never_accumulates() {
        let (mut surface, mut painter, mut store) = setup();
        store.add(Drawing::level(DrawingKind::Horizontal, 100.0));
        store.add(Drawing::from_points(
            DrawingKind::TrendLine,
            vec![
                ChartPoint { time: 1, price: 1.0 },
                ChartPoint { time: 2, price: 2.0 },
            ],
        ));

        painter.repaint(&mut surface, &store);
        painter.repaint(&mut surface, &store);
        painter.repaint(&mut surface, &store);

        // 1 main candle series + 1 trendline series; 1 horizontal line.
        assert_eq!(surface.series_count(), 2);
        assert_eq!(surface.price_line_count(), 1);
    }

    #[test]
    fn clear_releases_everything_for_teardown() {
        let (mut surface, mut painter, mut store) = setup();
        store.add(Drawing::level(DrawingKind::Rect, 100.0));
        painter.repaint(&mut surface, &store);
        assert_eq!(surface.price_line_count(), 2);

        painter.clear(&mut surface);
        assert_eq!(surface.price_line_count(), 0);
        painter.clear(&mut surface); // second clear is harmless
    }
}
