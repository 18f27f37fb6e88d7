use {
    serde::{Deserialize, Serialize},
    strum_macros::Display,
    uuid::Uuid,
};

/// A pointer event resolved to chart coordinates by the host surface.
/// Events that miss the plotted area never reach this type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub time: i64,
    pub price: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DrawingKind {
    Horizontal,
    Rect,
    TrendLine,
    Fibonacci,
    LongShort,
}

/// Drawing geometry. Horizontal lines and rect zones anchor to a single
/// price; the multi-click tools carry their full click list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Geometry {
    Level { price: f64 },
    Points(Vec<ChartPoint>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Drawing {
    pub id: Uuid,
    pub kind: DrawingKind,
    pub geometry: Geometry,
}

impl Drawing {
    pub fn level(kind: DrawingKind, price: f64) -> Self {
        Drawing {
            id: Uuid::new_v4(),
            kind,
            geometry: Geometry::Level { price },
        }
    }

    pub fn from_points(kind: DrawingKind, points: Vec<ChartPoint>) -> Self {
        Drawing {
            id: Uuid::new_v4(),
            kind,
            geometry: Geometry::Points(points),
        }
    }

    /// Point-list geometries are always consumed in ascending-time order at
    /// render time, regardless of the order the user clicked in.
    pub fn points_time_sorted(&self) -> Vec<ChartPoint> {
        match &self.geometry {
            Geometry::Level { .. } => Vec::new(),
            Geometry::Points(points) => {
                let mut sorted = points.clone();
                sorted.sort_by_key(|p| p.time);
                sorted
            }
        }
    }
}

/// How many clicks a fibonacci/long-short style level set reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelPrecision {
    /// Mid-capture preview: endpoints plus the midpoint.
    Guide,
    /// Committed drawing: the full retracement set.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// One builder for both the preview and the committed fibonacci levels, so
/// the two paths cannot drift apart.
pub fn fib_levels(a: f64, b: f64, precision: LevelPrecision) -> Vec<FibLevel> {
    use crate::config::constants::fib;

    let low = a.min(b);
    let high = a.max(b);
    let span = high - low;
    let ratios = match precision {
        LevelPrecision::Guide => fib::GUIDE_RATIOS,
        LevelPrecision::Full => fib::FULL_RATIOS,
    };

    ratios
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: low + ratio * span,
        })
        .collect()
}

/// `|target - entry| / |entry - stop|`. Returns None when the stop sits on
/// the entry (zero risk is not a ratio).
pub fn risk_reward(entry: f64, stop: f64, target: f64) -> Option<f64> {
    let risk = (entry - stop).abs();
    if risk == 0.0 {
        return None;
    }
    Some((target - entry).abs() / risk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fib_full_levels_between_extremes() {
        let levels = fib_levels(50.0, 70.0, LevelPrecision::Full);
        let prices: Vec<f64> = levels.iter().map(|l| l.price).collect();

        assert_eq!(levels.len(), 5);
        for (got, want) in prices.iter().zip([50.0, 57.64, 60.0, 62.36, 70.0]) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }

    #[test]
    fn fib_guide_levels_are_three() {
        let levels = fib_levels(70.0, 50.0, LevelPrecision::Guide);
        let prices: Vec<f64> = levels.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![50.0, 60.0, 70.0]);
    }

    #[test]
    fn risk_reward_rounds_to_two_decimals_in_label() {
        let rr = risk_reward(100.0, 90.0, 130.0).unwrap();
        assert_eq!(format!("{rr:.2}"), "3.00");
    }

    #[test]
    fn risk_reward_rejects_zero_risk() {
        assert!(risk_reward(100.0, 100.0, 130.0).is_none());
    }

    #[test]
    fn points_render_in_time_order_regardless_of_click_order() {
        let drawing = Drawing::from_points(
            DrawingKind::TrendLine,
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
        );
        let sorted = drawing.points_time_sorted();
        assert_eq!(sorted[0].time, 1_000);
        assert_eq!(sorted[1].time, 2_000);
    }
}
