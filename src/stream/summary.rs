use chrono::{DateTime, Local};

use super::event::KlineEvent;

const TIME_FORMAT: &str = "%H:%M:%S";
const UNKNOWN_TIME: &str = "--:--:--";

/// Local wall-clock time of an epoch millisecond value, truncated to seconds
/// (toward zero, so pre-epoch values round up).
pub fn format_event_time(millis: i64) -> String {
    match DateTime::from_timestamp(millis / 1000, 0) {
        Some(ts) => ts.with_timezone(&Local).format(TIME_FORMAT).to_string(),
        None => UNKNOWN_TIME.to_string(),
    }
}

/// One printable line per kline event, `None` for frames without a symbol.
pub fn summary_line(event: &KlineEvent) -> Option<String> {
    if !event.has_symbol() {
        return None;
    }
    let data = &event.data;
    let k = &data.kline;
    Some(format!(
        "Time: {} | Symbol: {} | Open: {} | High: {} | Low: {} | Close: {} | Volume: {}",
        format_event_time(data.event_time),
        data.symbol,
        k.open,
        k.high,
        k.low,
        k.close,
        k.volume,
    ))
}
