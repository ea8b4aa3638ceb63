use crate::core::{TransferValue, Value};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Ticks (100ns units since 0001-01-01 UTC) at the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

/// Integer unit a timestamp is converted to before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    /// 100ns units since 0001-01-01 UTC.
    #[default]
    Ticks,
    /// Milliseconds since 1970-01-01 UTC.
    UnixMillis,
}

impl TimestampUnit {
    pub fn encode(self, time: &DateTime<Utc>) -> i64 {
        match self {
            Self::Ticks => {
                let seconds = time.timestamp().saturating_mul(TICKS_PER_SECOND);
                let sub_ticks = i64::from(time.timestamp_subsec_nanos()) / NANOS_PER_TICK;
                UNIX_EPOCH_TICKS
                    .saturating_add(seconds)
                    .saturating_add(sub_ticks)
            }
            Self::UnixMillis => time.timestamp_millis(),
        }
    }

    /// Inverse of [`encode`](Self::encode); `None` when out of chrono's range.
    pub fn decode(self, raw: i64) -> Option<DateTime<Utc>> {
        match self {
            Self::Ticks => {
                let since_epoch = raw.checked_sub(UNIX_EPOCH_TICKS)?;
                let seconds = since_epoch.div_euclid(TICKS_PER_SECOND);
                let nanos = since_epoch.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
                DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
            }
            Self::UnixMillis => DateTime::from_timestamp_millis(raw),
        }
    }
}

/// Converts an in-memory value into its store-transferable form.
///
/// Scalars pass through untouched; textual formatting happens only when a
/// literal statement is rendered.
pub fn normalize(value: &Value, unit: TimestampUnit) -> TransferValue {
    match value {
        Value::Null => TransferValue::Null,
        Value::Integer(v) => TransferValue::Integer(*v),
        Value::Float(v) => TransferValue::Float(*v),
        Value::Decimal(v) => TransferValue::Decimal(*v),
        Value::Text(v) => TransferValue::Text(v.clone()),
        Value::Boolean(v) => TransferValue::Boolean(*v),
        Value::Timestamp(v) => TransferValue::Integer(unit.encode(v)),
        Value::Inline(payload) => TransferValue::Text(payload.as_str().to_string()),
        Value::Json(v) => TransferValue::Json(v.clone()),
    }
}
