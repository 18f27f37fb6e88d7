use {
    crate::config::STREAM,
    serde::{Deserialize, Serialize},
};

/// Chart timeframe. Maps to the `period`/`interval` query pair the history
/// backend expects.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    D1,
    W1,
}

impl Timeframe {
    pub fn interval_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1wk",
        }
    }

    /// How far back to ask for. Intraday intervals only serve short windows.
    pub fn period_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1d",
            Timeframe::M5 => "5d",
            Timeframe::M15 => "5d",
            Timeframe::H1 => "1mo",
            Timeframe::D1 => "5y",
            Timeframe::W1 => "max",
        }
    }

    pub fn interval_ms(&self) -> i64 {
        use crate::utils::TimeUtils;
        match self {
            Timeframe::M1 => TimeUtils::MS_IN_MIN,
            Timeframe::M5 => 5 * TimeUtils::MS_IN_MIN,
            Timeframe::M15 => 15 * TimeUtils::MS_IN_MIN,
            Timeframe::H1 => TimeUtils::MS_IN_H,
            Timeframe::D1 => TimeUtils::MS_IN_D,
            Timeframe::W1 => 7 * TimeUtils::MS_IN_D,
        }
    }
}

/// A symbol plus the timeframe it is charted at. One chart instance tracks
/// exactly one of these at a time.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Instrument {
            symbol: symbol.into().to_uppercase(),
            timeframe,
        }
    }

    /// Broker-direct ticks are only available for instruments on the
    /// broker-covered exchanges.
    pub fn is_broker_covered(&self) -> bool {
        let covered_suffix = STREAM
            .broker
            .covered_suffixes
            .iter()
            .any(|suffix| self.symbol.ends_with(suffix));
        let covered_index = STREAM
            .broker
            .covered_indices
            .iter()
            .any(|index| self.symbol.contains(index));
        covered_suffix || covered_index
    }

    /// The identifier the broker data socket subscribes with
    /// (e.g. "SBIN.NSE" becomes "NSE:SBIN-EQ").
    pub fn broker_id(&self) -> String {
        if let Some(base) = self.symbol.strip_suffix(".NSE") {
            format!("NSE:{}-EQ", base)
        } else if let Some(base) = self.symbol.strip_suffix(".BO") {
            format!("BSE:{}-EQ", base)
        } else {
            self.symbol.clone()
        }
    }

    /// Per-symbol server-broadcast channel endpoint.
    pub fn channel_url(&self) -> String {
        format!("{}/{}", STREAM.ws.base_url, self.symbol)
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} @ {}", self.symbol, self.timeframe.interval_str())
    }
}
