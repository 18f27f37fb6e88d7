// Domain types and value objects
mod candle;
mod drawing;
mod instrument;

// Re-export commonly used types
pub use candle::{Candle, CandleType, sanitize_candles};
pub use drawing::{
    ChartPoint, Drawing, DrawingKind, FibLevel, Geometry, LevelPrecision, fib_levels, risk_reward,
};
pub use instrument::{Instrument, Timeframe};
