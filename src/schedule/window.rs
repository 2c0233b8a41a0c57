use chrono::NaiveTime;

use crate::types::TimeWindow;

pub fn is_within_window(now: NaiveTime, windows: &[TimeWindow]) -> bool {
    windows.iter().any(|w| w.contains(now))
}
