use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const SUBSCRIBE_METHOD: &str = "SUBSCRIBE";
pub const SUBSCRIBE_ID: u64 = 1;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubscribeRequest {
    pub method: String,
    pub params: Vec<String>,
    pub id: u64,
}

impl SubscribeRequest {
    pub fn new(streams: &[String]) -> Self {
        SubscribeRequest {
            method: SUBSCRIBE_METHOD.to_string(),
            params: streams.to_vec(),
            id: SUBSCRIBE_ID,
        }
    }
}

// every field defaults when missing or null, so frames of another shape
// (e.g. the subscription ack) still decode and are told apart by an empty symbol
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Kline {
    #[serde(rename = "t", deserialize_with = "null_as_default")]
    pub open_time: i64,
    #[serde(rename = "T", deserialize_with = "null_as_default")]
    pub close_time: i64,
    #[serde(rename = "i", deserialize_with = "null_as_default")]
    pub interval: String,
    #[serde(rename = "f", deserialize_with = "null_as_default")]
    pub first_trade_id: i64,
    #[serde(rename = "L", deserialize_with = "null_as_default")]
    pub last_trade_id: i64,
    #[serde(rename = "o", deserialize_with = "null_as_default")]
    pub open: String,
    #[serde(rename = "c", deserialize_with = "null_as_default")]
    pub close: String,
    #[serde(rename = "h", deserialize_with = "null_as_default")]
    pub high: String,
    #[serde(rename = "l", deserialize_with = "null_as_default")]
    pub low: String,
    #[serde(rename = "v", deserialize_with = "null_as_default")]
    pub volume: String,
    #[serde(rename = "n", deserialize_with = "null_as_default")]
    pub trades: i64,
    #[serde(rename = "x", deserialize_with = "null_as_default")]
    pub closed: bool,
    #[serde(rename = "q", deserialize_with = "null_as_default")]
    pub quote_volume: String,
    #[serde(rename = "V", deserialize_with = "null_as_default")]
    pub taker_buy_volume: String,
    #[serde(rename = "Q", deserialize_with = "null_as_default")]
    pub taker_buy_quote_volume: String,
    #[serde(rename = "B", deserialize_with = "null_as_default")]
    pub ignore: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KlinePayload {
    #[serde(rename = "e", deserialize_with = "null_as_default")]
    pub event_type: String,
    #[serde(rename = "E", deserialize_with = "null_as_default")]
    pub event_time: i64,
    #[serde(rename = "s", deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(rename = "k", deserialize_with = "null_as_default")]
    pub kline: Kline,
}

/// Combined stream envelope, `{"stream": ..., "data": {...}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KlineEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub stream: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data: KlinePayload,
}

impl KlineEvent {
    /// Decodes one frame. Going through `Value` lets the last of a duplicated
    /// key win, and a bare `null` decodes as an empty event.
    pub fn from_slice(payload: &[u8]) -> serde_json::Result<Self> {
        match serde_json::from_slice::<Value>(payload)? {
            Value::Null => Ok(KlineEvent::default()),
            value => serde_json::from_value(value),
        }
    }

    pub fn has_symbol(&self) -> bool {
        !self.data.symbol.is_empty()
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_FRAME: &str = r#"{"stream":"btcusdt@kline_1s","data":{"e":"kline","E":1700000000000,"s":"BTCUSDT","k":{"t":1699999999000,"T":1699999999999,"s":"BTCUSDT","i":"1s","f":100,"L":200,"o":"10","c":"10.5","h":"11","l":"9","v":"100","n":101,"x":true,"q":"1050","V":"40","Q":"420","B":"0"}}}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_wire_format() {
        let streams: Vec<String> = vec!["btcusdt@kline_1s".into(), "ethusdt@kline_1s".into(), "bnbusdt@kline_1s".into()];
        let request = SubscribeRequest::new(&streams);
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"method":"SUBSCRIBE","params":["btcusdt@kline_1s","ethusdt@kline_1s","bnbusdt@kline_1s"],"id":1}"#
        );
    }

    #[test]
    fn test_decode_kline_frame() {
        let event = KlineEvent::from_slice(SAMPLE_FRAME.as_bytes()).unwrap();
        assert!(event.has_symbol());
        assert_eq!(event.stream, "btcusdt@kline_1s");
        assert_eq!(event.data.event_type, "kline");
        assert_eq!(event.data.event_time, 1_700_000_000_000);
        assert_eq!(event.data.symbol, "BTCUSDT");
        let k = &event.data.kline;
        assert_eq!(k.interval, "1s");
        assert_eq!((k.open_time, k.close_time), (1_699_999_999_000, 1_699_999_999_999));
        assert_eq!((k.first_trade_id, k.last_trade_id, k.trades), (100, 200, 101));
        assert_eq!(
            (k.open.as_str(), k.high.as_str(), k.low.as_str(), k.close.as_str(), k.volume.as_str()),
            ("10", "11", "9", "10.5", "100")
        );
        assert!(k.closed);
        assert_eq!(k.quote_volume, "1050");
        assert_eq!(k.taker_buy_volume, "40");
        assert_eq!(k.taker_buy_quote_volume, "420");
    }

    #[test]
    fn test_subscription_ack_has_no_symbol() {
        let event = KlineEvent::from_slice(br#"{"result":null,"id":1}"#).unwrap();
        assert!(!event.has_symbol());
    }

    #[test]
    fn test_nulls_decode_as_empty() {
        for frame in [
            "null",
            r#"{"stream":null,"data":null}"#,
            r#"{"data":{"s":null,"E":null,"k":null}}"#,
            r#"{"data":{"s":"","k":{"o":null,"x":null,"n":null}}}"#,
        ] {
            let event = KlineEvent::from_slice(frame.as_bytes()).unwrap();
            assert!(!event.has_symbol(), "{}", frame);
        }

        let event = KlineEvent::from_slice(br#"{"data":{"s":"BTCUSDT","E":null,"k":{"o":"10","h":null}}}"#).unwrap();
        assert_eq!(event.data.symbol, "BTCUSDT");
        assert_eq!(event.data.event_time, 0);
        assert_eq!(event.data.kline.open, "10");
        assert_eq!(event.data.kline.high, "");
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let event = KlineEvent::from_slice(br#"{"data":{"s":"A","s":"B"}}"#).unwrap();
        assert_eq!(event.data.symbol, "B");
    }

    #[test]
    fn test_wrong_field_type_is_an_error() {
        assert!(KlineEvent::from_slice(br#"{"data":{"E":"soon","s":"BTCUSDT"}}"#).is_err());
        assert!(KlineEvent::from_slice(b"not json").is_err());
        assert!(KlineEvent::from_slice(b"[1,2]").is_err());
    }
}
