use crate::domain::Candle;
use crate::indicators::math::atr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

/// One SuperTrend output per candle from index `period - 1` onward. While
/// trending up the line rides the ratcheted lower band, while trending down
/// the upper band; the host colors the two states differently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuperTrendPoint {
    pub time: i64,
    pub value: f64,
    pub trend: Trend,
}

pub fn supertrend(candles: &[Candle], period: usize, multiplier: f64) -> Vec<SuperTrendPoint> {
    let atr_series = atr(candles, period);
    if atr_series.is_empty() {
        return Vec::new();
    }

    let start = period - 1;
    let mut out = Vec::with_capacity(atr_series.len());

    let mut final_upper = f64::NAN;
    let mut final_lower = f64::NAN;
    let mut prev_close = f64::NAN;
    let mut trend = Trend::Up;

    for (offset, &atr_value) in atr_series.iter().enumerate() {
        let candle = &candles[start + offset];
        let basic_upper = candle.mid() + multiplier * atr_value;
        let basic_lower = candle.mid() - multiplier * atr_value;

        if offset == 0 {
            final_upper = basic_upper;
            final_lower = basic_lower;
        } else {
            // Bands only ratchet in the trend's favor. A close through the
            // previous band releases it back to the basic band.
            final_upper = if basic_upper < final_upper || prev_close > final_upper {
                basic_upper
            } else {
                final_upper
            };
            final_lower = if basic_lower > final_lower || prev_close < final_lower {
                basic_lower
            } else {
                final_lower
            };
        }

        trend = match trend {
            Trend::Up if candle.close < final_lower => Trend::Down,
            Trend::Down if candle.close > final_upper => Trend::Up,
            unchanged => unchanged,
        };

        let value = match trend {
            Trend::Up => final_lower,
            Trend::Down => final_upper,
        };
        out.push(SuperTrendPoint {
            time: candle.time,
            value,
            trend,
        });
        prev_close = candle.close;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(i * 1_000, open, high, low, close, 0.0)
    }

    fn trending(n: usize, step: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * step;
                candle(i as i64, base, base + 1.0, base - 1.0, base + step * 0.5)
            })
            .collect()
    }

    #[test]
    fn output_length_is_len_minus_warmup() {
        let data = trending(30, 0.5);
        let out = supertrend(&data, 10, 3.0);
        assert_eq!(out.len(), 30 - (10 - 1));
    }

    #[test]
    fn too_short_input_yields_empty_output() {
        let data = trending(8, 0.5);
        assert!(supertrend(&data, 10, 3.0).is_empty());
    }

    #[test]
    fn uptrend_rides_the_lower_band() {
        let data = trending(40, 1.0);
        let out = supertrend(&data, 10, 3.0);
        assert!(out.iter().all(|p| p.trend == Trend::Up));
        // Lower band sits below price the whole way up.
        for (p, c) in out.iter().zip(&data[9..]) {
            assert!(p.value < c.close);
        }
    }

    #[test]
    fn crash_below_lower_band_flips_trend_down() {
        let mut data = trending(20, 1.0);
        // Collapse far below any plausible lower band.
        let last_time = 20;
        data.push(candle(last_time, 60.0, 61.0, 40.0, 41.0));
        let out = supertrend(&data, 10, 2.0);
        assert_eq!(out.last().unwrap().trend, Trend::Down);
        // In a downtrend the line is the upper band, above the close.
        assert!(out.last().unwrap().value > 41.0);
    }

    #[test]
    fn lower_band_ratchets_up_in_an_uptrend() {
        let data = trending(40, 1.0);
        let out = supertrend(&data, 10, 3.0);
        for w in out.windows(2) {
            assert!(w[1].value >= w[0].value - 1e-9);
        }
    }
}
