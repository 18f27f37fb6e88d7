//! Smart-Money-Concepts scanner: fair value gaps and order blocks over
//! consecutive candle triples.

use std::collections::BTreeMap;

use crate::config::constants::smc;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapSide {
    Bullish,
    Bearish,
}

impl GapSide {
    pub fn zone_label(&self) -> &'static str {
        match self {
            GapSide::Bullish => "DEMAND GAP",
            GapSide::Bearish => "SUPPLY GAP",
        }
    }
}

/// Color override for the middle candle of a gap triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapTint {
    pub time: i64,
    pub side: GapSide,
}

/// A horizontal demand/supply level left behind by a recent gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapZone {
    pub price: f64,
    pub side: GapSide,
}

/// An order-block candle: the last opposite-direction bar before an
/// engulfing move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMarker {
    pub time: i64,
    pub side: GapSide,
}

#[derive(Debug, Clone, Default)]
pub struct SmcScan {
    pub tints: Vec<GapTint>,
    pub zones: Vec<GapZone>,
    pub markers: Vec<BlockMarker>,
}

pub fn scan(candles: &[Candle]) -> SmcScan {
    let len = candles.len();
    if len < 4 {
        return SmcScan::default();
    }

    let zone_cutoff = len.saturating_sub(smc::ZONE_WINDOW);
    let mut tints = Vec::new();
    let mut zones = Vec::new();
    // Keyed by candle time: first occurrence wins, iteration is ascending.
    let mut markers: BTreeMap<i64, BlockMarker> = BTreeMap::new();

    // The final forming candle never closes a triple.
    for i in 2..len - 1 {
        let first = &candles[i - 2];
        let middle = &candles[i - 1];
        let third = &candles[i];

        // Fair value gap: the first and third candle ranges do not overlap.
        if third.low > first.high {
            tints.push(GapTint {
                time: middle.time,
                side: GapSide::Bullish,
            });
            if i >= zone_cutoff {
                zones.push(GapZone {
                    price: first.high,
                    side: GapSide::Bullish,
                });
            }
        } else if third.high < first.low {
            tints.push(GapTint {
                time: middle.time,
                side: GapSide::Bearish,
            });
            if i >= zone_cutoff {
                zones.push(GapZone {
                    price: first.low,
                    side: GapSide::Bearish,
                });
            }
        }

        // Order block: a bar engulfed by the very next bar (simplified to a
        // close beyond the prior open).
        if middle.is_bearish() && third.is_bullish() && third.close > middle.open {
            markers.entry(middle.time).or_insert(BlockMarker {
                time: middle.time,
                side: GapSide::Bullish,
            });
        } else if middle.is_bullish() && third.is_bearish() && third.close < middle.open {
            markers.entry(middle.time).or_insert(BlockMarker {
                time: middle.time,
                side: GapSide::Bearish,
            });
        }
    }

    // Only the freshest zone lines survive, oldest dropped first.
    if zones.len() > smc::MAX_ZONE_LINES {
        zones.drain(..zones.len() - smc::MAX_ZONE_LINES);
    }

    SmcScan {
        tints,
        zones,
        markers: markers.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(i * 1_000, open, high, low, close, 0.0)
    }

    fn quiet(i: i64) -> Candle {
        candle(i, 100.0, 101.0, 99.0, 100.0)
    }

    #[test]
    fn bullish_gap_flags_middle_candle_and_zone_price() {
        // candle[0].high = 100, candle[2].low = 105 -> gap at index 1.
        let data = vec![
            candle(0, 99.0, 100.0, 98.0, 99.5),
            candle(1, 100.0, 104.0, 100.0, 103.0),
            candle(2, 105.0, 108.0, 105.0, 107.0),
            candle(3, 107.0, 109.0, 106.0, 108.0),
        ];

        let scan = scan(&data);
        assert_eq!(scan.tints.len(), 1);
        assert_eq!(scan.tints[0].time, 1_000);
        assert_eq!(scan.tints[0].side, GapSide::Bullish);
        assert_eq!(scan.zones.len(), 1);
        assert_eq!(scan.zones[0].price, 100.0);
        assert_eq!(scan.zones[0].side.zone_label(), "DEMAND GAP");
    }

    #[test]
    fn bearish_gap_mirrors_with_supply_label() {
        let data = vec![
            candle(0, 106.0, 108.0, 105.0, 107.0),
            candle(1, 104.0, 105.0, 101.0, 102.0),
            candle(2, 100.0, 100.5, 98.0, 99.0),
            candle(3, 99.0, 100.0, 98.0, 99.5),
        ];

        let scan = scan(&data);
        assert_eq!(scan.tints.len(), 1);
        assert_eq!(scan.tints[0].side, GapSide::Bearish);
        assert_eq!(scan.zones[0].price, 105.0);
        assert_eq!(scan.zones[0].side.zone_label(), "SUPPLY GAP");
    }

    #[test]
    fn final_forming_candle_never_closes_a_triple() {
        // Same gap shape, but the third candle is the last in the array.
        let data = vec![
            candle(0, 99.0, 100.0, 98.0, 99.5),
            candle(1, 100.0, 104.0, 100.0, 103.0),
            candle(2, 105.0, 108.0, 105.0, 107.0),
        ];
        assert!(scan(&data).tints.is_empty());
    }

    #[test]
    fn zone_lines_cap_at_five_dropping_oldest() {
        // Seven stacked bullish gaps, each triple fully above the last.
        let mut data = Vec::new();
        for g in 0..7i64 {
            let base = 100.0 + g as f64 * 20.0;
            data.push(candle(g * 3, base, base + 1.0, base - 1.0, base + 0.5));
            data.push(candle(g * 3 + 1, base + 2.0, base + 6.0, base + 2.0, base + 5.0));
            data.push(candle(g * 3 + 2, base + 8.0, base + 10.0, base + 8.0, base + 9.0));
        }
        data.push(quiet(100));

        let scan = scan(&data);
        assert_eq!(scan.zones.len(), 5);
        // Oldest zones (prices 101, 121) were dropped.
        assert!(scan.zones.iter().all(|z| z.price > 121.5));
    }

    #[test]
    fn order_block_marks_engulfed_bar_below() {
        let data = vec![
            quiet(0),
            candle(1, 103.0, 104.0, 99.0, 100.0), // down bar
            candle(2, 100.0, 106.0, 100.0, 105.0), // engulfing up bar
            quiet(3),
        ];

        let scan = scan(&data);
        assert_eq!(scan.markers.len(), 1);
        assert_eq!(scan.markers[0].time, 1_000);
        assert_eq!(scan.markers[0].side, GapSide::Bullish);
    }

    #[test]
    fn markers_come_out_sorted_and_deduplicated() {
        let mut data = vec![
            quiet(0),
            candle(1, 103.0, 104.0, 99.0, 100.0),
            candle(2, 100.0, 106.0, 100.0, 105.0),
            quiet(3),
            candle(4, 105.0, 106.0, 101.0, 102.0),
            candle(5, 102.0, 108.0, 102.0, 107.0),
            quiet(6),
        ];
        data.push(quiet(7));

        let scan = scan(&data);
        let times: Vec<i64> = scan.markers.iter().map(|m| m.time).collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(times, sorted);
    }
}
