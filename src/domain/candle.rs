use serde::{Deserialize, Serialize};

// Define the CandleType enum
#[derive(Debug, PartialEq)]
pub enum CandleType {
    Bullish,
    Bearish,
}

/// One time-bucketed OHLCV bar. `time` is epoch milliseconds.
///
/// The candle array is the single source of truth for price history. Only the
/// last element may be mutated after load, and only through `apply_tick`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Candle {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn get_type(&self) -> CandleType {
        if self.close >= self.open {
            CandleType::Bullish
        } else {
            CandleType::Bearish
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Bar midpoint, the anchor for SuperTrend bands.
    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Patch rule for a live last-traded-price tick. `open` and `time` are
    /// never touched.
    pub fn apply_tick(&mut self, price: f64) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
    }

    /// A fetched row is usable only when every OHLC field is a finite number.
    pub fn has_valid_ohlc(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }
}

/// Drops rows with broken OHLC fields and anything violating the
/// strictly-increasing time invariant. Returns how many rows were dropped.
pub fn sanitize_candles(raw: Vec<Candle>) -> (Vec<Candle>, usize) {
    let total = raw.len();
    let mut out: Vec<Candle> = Vec::with_capacity(total);

    for candle in raw {
        if !candle.has_valid_ohlc() {
            continue;
        }
        if let Some(last) = out.last() {
            if candle.time <= last.time {
                continue;
            }
        }
        out.push(candle);
    }

    let dropped = total - out.len();
    (out, dropped)
}
