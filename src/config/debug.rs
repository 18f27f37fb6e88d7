//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Emit verbose logging for live tick channel connections and ticks.
    pub log_live_ticks: bool,

    /// Log every historical load (request, candle counts, dropped rows).
    pub log_history_loads: bool,

    /// Log pane margin recomputes when the indicator set changes.
    pub log_pane_layout: bool,

    /// Log drawing-tool commits and preview rebuilds.
    pub log_drawing_tools: bool,
}

pub const DF: LogFlags = LogFlags {
    log_live_ticks: false,
    log_history_loads: false,
    log_pane_layout: false,
    log_drawing_tools: false,
};
