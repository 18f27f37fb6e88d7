//! Indicator registry and pane layout.
//!
//! Adding an indicator computes its value series from the current candles,
//! creates renderer series, and re-stacks the oscillator panes from the
//! bottom of the chart. A computation failure aborts the add with no partial
//! state left behind.

use {
    anyhow::{Context, Result, bail},
    uuid::Uuid,
};

use crate::config::DF;
use crate::config::constants::{PANE_HEIGHT, PRICE_TOP_MARGIN, VOLUME_BUFFER, palette};
use crate::domain::Candle;
use crate::indicators::{IndicatorKind, IndicatorParams, math, smc, supertrend};
use crate::render::{
    LineStyle, MarkerPosition, MarkerShape, MarkerSpec, BarTint, PriceLineId, PriceLineSpec,
    RenderSurface, ScaleId, ScaleMargins, SeriesId, SeriesKind, SeriesPoint, SeriesStyle,
};

#[derive(Debug, Clone)]
pub struct IndicatorInstance {
    pub id: Uuid,
    pub kind: IndicatorKind,
    pub params: IndicatorParams,
    /// Present only for oscillator-class kinds.
    pub pane: Option<u32>,
    pub series: Vec<SeriesId>,
    /// SMC gap-zone lines, attached to the main candle series.
    zone_lines: Vec<PriceLineId>,
}

/// Owns the active indicator set and everything those indicators placed on
/// the surface.
pub struct IndicatorManager {
    main_series: SeriesId,
    active: Vec<IndicatorInstance>,
    next_pane: u32,
    line_color_cursor: usize,
}

/// One renderer series an indicator wants created.
struct SeriesPlan {
    kind: SeriesKind,
    style: SeriesStyle,
    points: Vec<SeriesPoint>,
}

impl IndicatorManager {
    pub fn new(main_series: SeriesId) -> Self {
        IndicatorManager {
            main_series,
            active: Vec::new(),
            next_pane: 0,
            line_color_cursor: 0,
        }
    }

    pub fn active(&self) -> &[IndicatorInstance] {
        &self.active
    }

    pub fn oscillator_count(&self) -> usize {
        self.active.iter().filter(|i| i.kind.is_oscillator()).count()
    }

    /// Validates, computes, renders and registers a new indicator instance.
    /// Any failure leaves the surface and the active set untouched.
    pub fn add<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        candles: &[Candle],
        kind: IndicatorKind,
        params: IndicatorParams,
    ) -> Result<Uuid> {
        params.validate_for(kind)?;

        let instance = if kind == IndicatorKind::Smc {
            self.add_smc(surface, candles)
        } else {
            // Compute everything before touching the surface, so an error
            // cannot leave half an indicator behind.
            let pane = kind.is_oscillator().then(|| self.next_pane);
            let scale = match pane {
                Some(p) => ScaleId::Pane(p),
                None => ScaleId::Price,
            };
            let plans = self
                .plan_series(kind, params, candles, scale)
                .with_context(|| format!("adding {kind}"))?;

            let mut series = Vec::with_capacity(plans.len());
            for plan in plans {
                let id = surface.add_series(plan.kind, plan.style);
                surface.set_series_data(id, plan.points);
                series.push(id);
            }
            if pane.is_some() {
                self.next_pane += 1;
            }
            IndicatorInstance {
                id: Uuid::new_v4(),
                kind,
                params,
                pane,
                series,
                zone_lines: Vec::new(),
            }
        };

        let id = instance.id;
        self.active.push(instance);
        self.relayout(surface);
        Ok(id)
    }

    fn add_smc<S: RenderSurface>(&mut self, surface: &mut S, candles: &[Candle]) -> IndicatorInstance {
        let scan = smc::scan(candles);
        surface.set_bar_tints(
            scan.tints
                .iter()
                .map(|t| BarTint {
                    time: t.time,
                    color: match t.side {
                        smc::GapSide::Bullish => palette::SMC_BULL_GAP.to_string(),
                        smc::GapSide::Bearish => palette::SMC_BEAR_GAP.to_string(),
                    },
                })
                .collect(),
        );
        surface.set_markers(
            scan.markers
                .iter()
                .map(|m| match m.side {
                    smc::GapSide::Bullish => MarkerSpec {
                        time: m.time,
                        position: MarkerPosition::BelowBar,
                        shape: MarkerShape::ArrowUp,
                        color: palette::SMC_OB_BULL.to_string(),
                        text: "OB".to_string(),
                    },
                    smc::GapSide::Bearish => MarkerSpec {
                        time: m.time,
                        position: MarkerPosition::AboveBar,
                        shape: MarkerShape::ArrowDown,
                        color: palette::SMC_OB_BEAR.to_string(),
                        text: "OB".to_string(),
                    },
                })
                .collect(),
        );
        let zone_lines = scan
            .zones
            .iter()
            .map(|zone| {
                surface.create_price_line(
                    self.main_series,
                    PriceLineSpec {
                        price: zone.price,
                        color: match zone.side {
                            smc::GapSide::Bullish => palette::SMC_OB_BULL.to_string(),
                            smc::GapSide::Bearish => palette::SMC_OB_BEAR.to_string(),
                        },
                        line_width: 1,
                        line_style: LineStyle::Dashed,
                        title: zone.side.zone_label().to_string(),
                    },
                )
            })
            .collect();

        IndicatorInstance {
            id: Uuid::new_v4(),
            kind: IndicatorKind::Smc,
            params: IndicatorParams::None,
            pane: None,
            series: Vec::new(),
            zone_lines,
        }
    }

    /// Releases an instance's surface artifacts and drops it from the active
    /// set. SMC has no series to release; its removal resets candle tints
    /// and markers instead.
    pub fn remove<S: RenderSurface>(&mut self, surface: &mut S, id: Uuid) {
        let Some(pos) = self.active.iter().position(|i| i.id == id) else {
            return;
        };
        let instance = self.active.remove(pos);

        if instance.kind.has_own_series() {
            for series in &instance.series {
                surface.remove_series(*series);
            }
        } else {
            surface.set_bar_tints(Vec::new());
            surface.set_markers(Vec::new());
        }
        for line in &instance.zone_lines {
            surface.remove_price_line(self.main_series, *line);
        }

        self.relayout(surface);
    }

    /// Re-runs every active indicator against a fresh candle array. Called
    /// after each historical reload.
    pub fn recompute_all<S: RenderSurface>(&mut self, surface: &mut S, candles: &[Candle]) {
        let mut stale: Vec<Uuid> = Vec::new();

        for idx in 0..self.active.len() {
            let (kind, params) = (self.active[idx].kind, self.active[idx].params);
            if kind == IndicatorKind::Smc {
                for line in std::mem::take(&mut self.active[idx].zone_lines) {
                    surface.remove_price_line(self.main_series, line);
                }
                let refreshed = self.add_smc(surface, candles);
                self.active[idx].zone_lines = refreshed.zone_lines;
                continue;
            }

            let scale = match self.active[idx].pane {
                Some(p) => ScaleId::Pane(p),
                None => ScaleId::Price,
            };
            match self.plan_series(kind, params, candles, scale) {
                Ok(plans) => {
                    for (series, plan) in self.active[idx].series.iter().zip(plans) {
                        surface.set_series_data(*series, plan.points);
                    }
                }
                Err(err) => {
                    // The new history is too short for this indicator. Drop
                    // it rather than render stale values.
                    log::warn!("dropping {kind} after reload: {err:#}");
                    stale.push(self.active[idx].id);
                }
            }
        }

        for id in stale {
            self.remove(surface, id);
        }
    }

    /// Releases every surface artifact owned by any indicator. Used at
    /// teardown.
    pub fn release_all<S: RenderSurface>(&mut self, surface: &mut S) {
        let ids: Vec<Uuid> = self.active.iter().map(|i| i.id).collect();
        for id in ids {
            self.remove(surface, id);
        }
    }

    /// Stacks oscillator panes from the bottom edge and pushes the main and
    /// volume scales up out of their way.
    fn relayout<S: RenderSurface>(&self, surface: &mut S) {
        let k = self.oscillator_count() as f64;
        let h = PANE_HEIGHT;

        surface.apply_scale_margins(
            ScaleId::Price,
            ScaleMargins {
                top: PRICE_TOP_MARGIN,
                bottom: k * h,
            },
        );
        surface.apply_scale_margins(
            ScaleId::Volume,
            ScaleMargins {
                top: (1.0 - k * h) - VOLUME_BUFFER,
                bottom: 0.0,
            },
        );

        for (i, instance) in self
            .active
            .iter()
            .filter(|i| i.kind.is_oscillator())
            .enumerate()
        {
            let pane = instance.pane.expect("oscillator without a pane");
            surface.apply_scale_margins(
                ScaleId::Pane(pane),
                ScaleMargins {
                    top: 1.0 - (i as f64 + 1.0) * h,
                    bottom: i as f64 * h,
                },
            );
        }

        if DF.log_pane_layout {
            log::debug!("pane layout recomputed for {k} oscillator panes");
        }
    }

    fn plan_series(
        &mut self,
        kind: IndicatorKind,
        params: IndicatorParams,
        candles: &[Candle],
        scale: ScaleId,
    ) -> Result<Vec<SeriesPlan>> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let plans = match (kind, params) {
            (IndicatorKind::Sma, IndicatorParams::Period(p)) => {
                vec![self.line_plan(candles, math::sma(&closes, p), scale)]
            }
            (IndicatorKind::Ema, IndicatorParams::Period(p)) => {
                vec![self.line_plan(candles, math::ema(&closes, p), scale)]
            }
            (IndicatorKind::Rsi, IndicatorParams::Period(p)) => {
                vec![self.line_plan(candles, math::rsi(&closes, p), scale)]
            }
            (IndicatorKind::Adx, IndicatorParams::Period(p)) => {
                vec![self.line_plan(candles, math::adx(candles, p), scale)]
            }
            (IndicatorKind::Atr, IndicatorParams::Period(p)) => {
                vec![self.line_plan(candles, math::atr(candles, p), scale)]
            }
            (IndicatorKind::Vwap, IndicatorParams::None) => {
                vec![self.line_plan(candles, math::vwap(candles), scale)]
            }
            (IndicatorKind::Macd, IndicatorParams::Triple { fast, slow, signal }) => {
                let out = math::macd(&closes, fast, slow, signal);
                vec![
                    SeriesPlan {
                        kind: SeriesKind::Histogram,
                        style: SeriesStyle::line(palette::MACD_HIST).on_scale(scale).width(1),
                        points: tail_points(candles, &out.histogram),
                    },
                    SeriesPlan {
                        kind: SeriesKind::Line,
                        style: SeriesStyle::line(palette::MACD_LINE).on_scale(scale),
                        points: tail_points(candles, &out.macd),
                    },
                    SeriesPlan {
                        kind: SeriesKind::Line,
                        style: SeriesStyle::line(palette::MACD_SIGNAL).on_scale(scale),
                        points: tail_points(candles, &out.signal),
                    },
                ]
            }
            (IndicatorKind::StochRsi, IndicatorParams::Triple { fast, slow, signal }) => {
                let out = math::stoch_rsi(&closes, fast, slow, signal);
                vec![
                    SeriesPlan {
                        kind: SeriesKind::Line,
                        style: SeriesStyle::line(palette::STOCH_K).on_scale(scale),
                        points: tail_points(candles, &out.k),
                    },
                    SeriesPlan {
                        kind: SeriesKind::Line,
                        style: SeriesStyle::line(palette::STOCH_D).on_scale(scale),
                        points: tail_points(candles, &out.d),
                    },
                ]
            }
            (IndicatorKind::SuperTrend, IndicatorParams::Band { period, multiplier }) => {
                let line = supertrend::supertrend(candles, period, multiplier);
                let split = |want: supertrend::Trend| {
                    line.iter()
                        .filter(|p| p.trend == want)
                        .map(|p| SeriesPoint {
                            time: p.time,
                            value: p.value,
                        })
                        .collect::<Vec<_>>()
                };
                if line.is_empty() {
                    bail!("not enough candles for SuperTrend({period})");
                }
                vec![
                    SeriesPlan {
                        kind: SeriesKind::Line,
                        style: SeriesStyle::line(palette::SUPERTREND_UP).on_scale(scale),
                        points: split(supertrend::Trend::Up),
                    },
                    SeriesPlan {
                        kind: SeriesKind::Line,
                        style: SeriesStyle::line(palette::SUPERTREND_DOWN).on_scale(scale),
                        points: split(supertrend::Trend::Down),
                    },
                ]
            }
            (IndicatorKind::EmaCross921, IndicatorParams::None) => {
                vec![
                    self.line_plan(candles, math::ema(&closes, 9), scale),
                    self.line_plan(candles, math::ema(&closes, 21), scale),
                ]
            }
            (IndicatorKind::EmaCross1221, IndicatorParams::None) => {
                vec![
                    self.line_plan(candles, math::ema(&closes, 12), scale),
                    self.line_plan(candles, math::ema(&closes, 21), scale),
                ]
            }
            // validate_for already rejected anything else
            (kind, params) => bail!("{kind}: unsupported params {params:?}"),
        };

        // An empty warm-up output means there is not enough history for the
        // requested settings. Abort the add, register nothing.
        if plans.iter().any(|plan| plan.points.is_empty()) {
            bail!("not enough candles loaded");
        }
        Ok(plans)
    }

    fn line_plan(&mut self, candles: &[Candle], values: Vec<f64>, scale: ScaleId) -> SeriesPlan {
        let color = palette::INDICATOR_LINES[self.line_color_cursor % palette::INDICATOR_LINES.len()];
        self.line_color_cursor += 1;
        SeriesPlan {
            kind: SeriesKind::Line,
            style: SeriesStyle::line(color).on_scale(scale),
            points: tail_points(candles, &values),
        }
    }
}

/// Aligns a warm-up-shortened value series to the tail of the candle array.
fn tail_points(candles: &[Candle], values: &[f64]) -> Vec<SeriesPoint> {
    let offset = candles.len().saturating_sub(values.len());
    candles[offset..]
        .iter()
        .zip(values)
        .map(|(c, &v)| SeriesPoint {
            time: c.time,
            value: v,
        })
        .collect()
}
