use chrono::DateTime;

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
}

// Time Helper functions

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for display/logging purposes only
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => format!("{}", dt.format(TimeUtils::STANDARD_TIME_FORMAT)),
        None => format!("bad-ts({epoch_ms})"),
    }
}

/// Epoch day bucket, used by session-anchored series such as VWAP.
pub fn epoch_ms_to_day(epoch_ms: i64) -> i64 {
    epoch_ms.div_euclid(TimeUtils::MS_IN_D)
}
