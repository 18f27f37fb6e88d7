//! Pure indicator math.
//!
//! Every series function is tail-aligned: the output may be shorter than the
//! input (warm-up period) and its last element always lines up with the last
//! input candle. Callers map output index `i` to input index
//! `input_len - output_len + i`. Not enough history yields an empty vec,
//! never a panic.

use itertools::izip;

use crate::domain::Candle;
use crate::utils::epoch_ms_to_day;

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    out.push(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(sum / period as f64);
    }
    out
}

/// EMA seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    out.push(seed);
    let mut prev = seed;
    for &v in &values[period..] {
        prev = (v - prev) * alpha + prev;
        out.push(prev);
    }
    out
}

/// Wilder RSI. First value is produced once `period` deltas exist, so the
/// output is `len - period` long.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period + 1 {
        return Vec::new();
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for w in values[..=period].windows(2) {
        let delta = w[1] - w[0];
        gains += delta.max(0.0);
        losses += (-delta).max(0.0);
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    let rsi_of = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    };

    let mut out = Vec::with_capacity(values.len() - period);
    out.push(rsi_of(avg_gain, avg_loss));

    let period_f = period as f64;
    for w in values[period..].windows(2) {
        let delta = w[1] - w[0];
        avg_gain = (avg_gain * (period_f - 1.0) + delta.max(0.0)) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + (-delta).max(0.0)) / period_f;
        out.push(rsi_of(avg_gain, avg_loss));
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD line, signal line and histogram, each tail-aligned to the input.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if fast == 0 || slow == 0 || signal == 0 || fast >= slow {
        return MacdSeries::default();
    }
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    if slow_ema.is_empty() {
        return MacdSeries::default();
    }

    // The fast EMA starts earlier; trim its head so both lines cover the
    // same candles.
    let offset = fast_ema.len() - slow_ema.len();
    let macd_line: Vec<f64> = izip!(&fast_ema[offset..], &slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&macd_line, signal);
    let hist_offset = macd_line.len() - signal_line.len();
    let histogram: Vec<f64> = izip!(&macd_line[hist_offset..], &signal_line)
        .map(|(m, s)| m - s)
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

#[derive(Debug, Clone, Default)]
pub struct KdSeries {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// Stochastic RSI: stochastic of the RSI series, %K smoothed once and %D a
/// further smoothing of %K.
pub fn stoch_rsi(values: &[f64], rsi_period: usize, stoch_period: usize, smoothing: usize) -> KdSeries {
    if stoch_period == 0 || smoothing == 0 {
        return KdSeries::default();
    }
    let rsi_series = rsi(values, rsi_period);
    if rsi_series.len() < stoch_period {
        return KdSeries::default();
    }

    let raw: Vec<f64> = rsi_series
        .windows(stoch_period)
        .map(|w| {
            let highest = w.iter().cloned().fold(f64::MIN, f64::max);
            let lowest = w.iter().cloned().fold(f64::MAX, f64::min);
            let range = highest - lowest;
            if range < 1e-12 {
                0.0
            } else {
                (w[stoch_period - 1] - lowest) / range * 100.0
            }
        })
        .collect();

    let k = sma(&raw, smoothing);
    let d = sma(&k, smoothing);
    KdSeries { k, d }
}

/// True range per candle; the first bar falls back to high - low.
fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    let mut prev_close: Option<f64> = None;
    candles
        .iter()
        .map(|c| {
            let tr = match prev_close {
                Some(pc) => (c.high - c.low)
                    .max((c.high - pc).abs())
                    .max((c.low - pc).abs()),
                None => c.high - c.low,
            };
            prev_close = Some(c.close);
            tr
        })
        .collect()
}

/// Wilder smoothing: seed with the plain mean, then blend one value at a
/// time. Output is `len - period + 1` long.
fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let period_f = period as f64;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut acc: f64 = values[..period].iter().sum::<f64>() / period_f;
    out.push(acc);
    for &v in &values[period..] {
        acc = (acc * (period_f - 1.0) + v) / period_f;
        out.push(acc);
    }
    out
}

/// ATR over `period`, output starting at input index `period - 1`.
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    wilder_smooth(&true_ranges(candles), period)
}

/// Average Directional Index. Needs roughly two warm-up periods of data.
pub fn adx(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < 2 * period {
        return Vec::new();
    }

    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    for w in candles.windows(2) {
        let up = w[1].high - w[0].high;
        let down = w[0].low - w[1].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }
    let tr = &true_ranges(candles)[1..];

    let smoothed_tr = wilder_smooth(tr, period);
    let smoothed_plus = wilder_smooth(&plus_dm, period);
    let smoothed_minus = wilder_smooth(&minus_dm, period);

    let dx: Vec<f64> = izip!(&smoothed_tr, &smoothed_plus, &smoothed_minus)
        .map(|(tr, plus, minus)| {
            if *tr < 1e-12 {
                return 0.0;
            }
            let plus_di = 100.0 * plus / tr;
            let minus_di = 100.0 * minus / tr;
            let di_sum = plus_di + minus_di;
            if di_sum < 1e-12 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / di_sum
            }
        })
        .collect();

    wilder_smooth(&dx, period)
}

/// Session-anchored VWAP: cumulative typical-price volume, reset at each new
/// epoch day. Full-length output.
pub fn vwap(candles: &[Candle]) -> Vec<f64> {
    let mut cur_day: Option<i64> = None;
    let mut pv_sum = 0.0;
    let mut vol_sum = 0.0;

    candles
        .iter()
        .map(|c| {
            let day = epoch_ms_to_day(c.time);
            if cur_day != Some(day) {
                cur_day = Some(day);
                pv_sum = 0.0;
                vol_sum = 0.0;
            }
            let typical = (c.high + c.low + c.close) / 3.0;
            pv_sum += typical * c.volume;
            vol_sum += c.volume.max(1e-12);
            pv_sum / vol_sum
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotLevels {
    pub pp: f64,
    pub r1: f64,
    pub s1: f64,
    pub r2: f64,
    pub s2: f64,
    pub r3: f64,
    pub s3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotSet {
    pub classic: PivotLevels,
    pub fibonacci: PivotLevels,
    pub camarilla: PivotLevels,
}

/// Classic / fibonacci / camarilla pivots from the previous session's
/// high, low and close.
pub fn pivot_points(prev: &Candle) -> PivotSet {
    let (high, low, close) = (prev.high, prev.low, prev.close);
    let range = high - low;
    let pp = (high + low + close) / 3.0;

    let classic = PivotLevels {
        pp,
        r1: 2.0 * pp - low,
        s1: 2.0 * pp - high,
        r2: pp + range,
        s2: pp - range,
        r3: high + 2.0 * (pp - low),
        s3: low - 2.0 * (high - pp),
    };

    let fibonacci = PivotLevels {
        pp,
        r1: pp + 0.382 * range,
        s1: pp - 0.382 * range,
        r2: pp + 0.618 * range,
        s2: pp - 0.618 * range,
        r3: pp + range,
        s3: pp - range,
    };

    let camarilla = PivotLevels {
        pp,
        r1: close + range * 1.1 / 12.0,
        s1: close - range * 1.1 / 12.0,
        r2: close + range * 1.1 / 6.0,
        s2: close - range * 1.1 / 6.0,
        r3: close + range * 1.1 / 4.0,
        s3: close - range * 1.1 / 4.0,
    };

    PivotSet {
        classic,
        fibonacci,
        camarilla,
    }
}

/// Latest values of the standard moving-average table. Periods without
/// enough history are omitted.
pub fn sma_snapshot(closes: &[f64]) -> Vec<(usize, f64)> {
    const PERIODS: &[usize] = &[5, 10, 20, 50, 100, 200];
    PERIODS
        .iter()
        .filter_map(|&p| sma(closes, p).last().map(|&v| (p, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle::new(i as i64 * 1_000, 10.0, 11.0, 9.0, 10.0, 100.0))
            .collect()
    }

    #[test]
    fn sma_is_tail_aligned() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn short_input_yields_empty_series() {
        assert!(sma(&[1.0, 2.0], 3).is_empty());
        assert!(ema(&[1.0, 2.0], 3).is_empty());
        assert!(rsi(&[1.0; 14], 14).is_empty()); // needs period + 1 values
        assert!(atr(&flat_candles(3), 5).is_empty());
    }

    #[test]
    fn rsi_is_one_hundred_on_pure_uptrend() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = rsi(&values, 14);
        assert_eq!(out.len(), 20 - 14);
        assert!(out.iter().all(|&v| (v - 100.0).abs() < 1e-9));
    }

    #[test]
    fn macd_lines_are_mutually_aligned() {
        let values: Vec<f64> = (0..60).map(|i| (i as f64 * 0.3).sin() + 10.0).collect();
        let out = macd(&values, 12, 26, 9);
        assert_eq!(out.macd.len(), 60 - 26 + 1);
        assert_eq!(out.signal.len(), out.macd.len() - 9 + 1);
        assert_eq!(out.histogram.len(), out.signal.len());

        let last_hist = out.histogram.last().unwrap();
        let expected = out.macd.last().unwrap() - out.signal.last().unwrap();
        assert!((last_hist - expected).abs() < 1e-12);
    }

    #[test]
    fn atr_on_constant_range_equals_that_range() {
        let out = atr(&flat_candles(10), 5);
        assert_eq!(out.len(), 10 - 5 + 1);
        assert!(out.iter().all(|&v| (v - 2.0).abs() < 1e-9));
    }

    #[test]
    fn vwap_tracks_typical_price_on_uniform_day() {
        let candles = flat_candles(5);
        let out = vwap(&candles);
        assert_eq!(out.len(), 5);
        // typical price is (11 + 9 + 10) / 3 = 10 throughout
        assert!(out.iter().all(|&v| (v - 10.0).abs() < 1e-9));
    }

    #[test]
    fn pivot_classic_matches_hand_calc() {
        let prev = Candle::new(0, 0.0, 110.0, 90.0, 100.0, 0.0);
        let set = pivot_points(&prev);
        assert!((set.classic.pp - 100.0).abs() < 1e-9);
        assert!((set.classic.r1 - 110.0).abs() < 1e-9);
        assert!((set.classic.s1 - 90.0).abs() < 1e-9);
        assert!((set.classic.r2 - 120.0).abs() < 1e-9);
    }

    #[test]
    fn sma_snapshot_skips_starved_periods() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let snapshot = sma_snapshot(&closes);
        let periods: Vec<usize> = snapshot.iter().map(|(p, _)| *p).collect();
        assert_eq!(periods, vec![5, 10, 20]);
    }
}
