pub mod math;
mod layout;
pub mod smc;
pub mod supertrend;

pub use layout::{IndicatorInstance, IndicatorManager};

use {
    anyhow::{Result, bail},
    serde::{Deserialize, Serialize},
    strum_macros::{Display, EnumIter},
};

/// Every indicator the chart can overlay or pane out.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter,
)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    StochRsi,
    Adx,
    Atr,
    Vwap,
    SuperTrend,
    Smc,
    /// Fixed dual-EMA preset, 9/21.
    EmaCross921,
    /// Fixed dual-EMA preset, 12/21.
    EmaCross1221,
}

impl IndicatorKind {
    /// Oscillators live on their own pane; everything else shares the main
    /// price scale.
    pub fn is_oscillator(&self) -> bool {
        matches!(
            self,
            IndicatorKind::Rsi
                | IndicatorKind::Macd
                | IndicatorKind::StochRsi
                | IndicatorKind::Adx
                | IndicatorKind::Atr
        )
    }

    /// SMC is the one kind that paints candles and markers directly instead
    /// of owning series. Removal dispatches on this capability.
    pub fn has_own_series(&self) -> bool {
        !matches!(self, IndicatorKind::Smc)
    }

    pub fn default_params(&self) -> IndicatorParams {
        match self {
            IndicatorKind::Sma => IndicatorParams::Period(20),
            IndicatorKind::Ema => IndicatorParams::Period(21),
            IndicatorKind::Rsi => IndicatorParams::Period(14),
            IndicatorKind::Adx => IndicatorParams::Period(14),
            IndicatorKind::Atr => IndicatorParams::Period(14),
            IndicatorKind::Macd => IndicatorParams::Triple {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorKind::StochRsi => IndicatorParams::Triple {
                fast: 14,
                slow: 14,
                signal: 3,
            },
            IndicatorKind::SuperTrend => IndicatorParams::Band {
                period: 10,
                multiplier: 3.0,
            },
            IndicatorKind::Vwap
            | IndicatorKind::Smc
            | IndicatorKind::EmaCross921
            | IndicatorKind::EmaCross1221 => IndicatorParams::None,
        }
    }
}

/// Parameters supplied with an add-indicator request.
///
/// `Triple` is fast/slow/signal for MACD and rsi/stochastic/smoothing for
/// StochRSI.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum IndicatorParams {
    None,
    Period(usize),
    Triple { fast: usize, slow: usize, signal: usize },
    Band { period: usize, multiplier: f64 },
}

impl IndicatorParams {
    pub fn validate_for(&self, kind: IndicatorKind) -> Result<()> {
        match (kind, self) {
            (
                IndicatorKind::Sma
                | IndicatorKind::Ema
                | IndicatorKind::Rsi
                | IndicatorKind::Adx
                | IndicatorKind::Atr,
                IndicatorParams::Period(period),
            ) => {
                if *period == 0 {
                    bail!("{kind}: period must be positive");
                }
            }
            (IndicatorKind::Macd, IndicatorParams::Triple { fast, slow, signal }) => {
                if *fast == 0 || *slow == 0 || *signal == 0 {
                    bail!("Macd: all periods must be positive");
                }
                if fast >= slow {
                    bail!("Macd: fast period must be below slow period");
                }
            }
            (IndicatorKind::StochRsi, IndicatorParams::Triple { fast, slow, signal }) => {
                if *fast == 0 || *slow == 0 || *signal == 0 {
                    bail!("StochRsi: all periods must be positive");
                }
            }
            (IndicatorKind::SuperTrend, IndicatorParams::Band { period, multiplier }) => {
                if *period == 0 {
                    bail!("SuperTrend: period must be positive");
                }
                if !multiplier.is_finite() || *multiplier <= 0.0 {
                    bail!("SuperTrend: multiplier must be a positive number");
                }
            }
            (
                IndicatorKind::Vwap
                | IndicatorKind::Smc
                | IndicatorKind::EmaCross921
                | IndicatorKind::EmaCross1221,
                IndicatorParams::None,
            ) => {}
            (kind, params) => bail!("{kind}: unexpected params {params:?}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oscillator_classification() {
        assert!(IndicatorKind::Rsi.is_oscillator());
        assert!(IndicatorKind::Macd.is_oscillator());
        assert!(!IndicatorKind::Sma.is_oscillator());
        assert!(!IndicatorKind::SuperTrend.is_oscillator());
        assert!(!IndicatorKind::Smc.is_oscillator());
    }

    #[test]
    fn smc_is_the_only_kind_without_series() {
        use strum::IntoEnumIterator;
        for kind in IndicatorKind::iter() {
            assert_eq!(kind.has_own_series(), kind != IndicatorKind::Smc);
        }
    }

    #[test]
    fn params_shape_is_checked_per_kind() {
        assert!(IndicatorParams::Period(14).validate_for(IndicatorKind::Rsi).is_ok());
        assert!(IndicatorParams::Period(0).validate_for(IndicatorKind::Rsi).is_err());
        assert!(IndicatorParams::None.validate_for(IndicatorKind::Rsi).is_err());
        assert!(
            IndicatorParams::Triple {
                fast: 26,
                slow: 12,
                signal: 9
            }
            .validate_for(IndicatorKind::Macd)
            .is_err()
        );
        assert!(IndicatorParams::None.validate_for(IndicatorKind::Vwap).is_ok());
    }
}
