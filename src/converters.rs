//! Built-in converters for timestamp leaf types.
//!
//! | opaque type      | JSON                     | Rust value      |
//! |------------------|--------------------------|-----------------|
//! | `iso_datetime`   | RFC 3339 text            | [`IsoDateTime`] |
//! | `epoch_millis`   | integer milliseconds     | [`EpochMillis`] |
//! | `epoch_micros`   | integer microseconds     | [`EpochMicros`] |

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::registry::{HookError, Registry};
use crate::value::{Opaque, Typed};

pub const ISO_DATETIME: &str = "iso_datetime";
pub const EPOCH_MILLIS: &str = "epoch_millis";
pub const EPOCH_MICROS: &str = "epoch_micros";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoDateTime(pub DateTime<FixedOffset>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochMillis(pub DateTime<Utc>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochMicros(pub DateTime<Utc>);

#[derive(Debug, Error)]
#[error("timestamp {0} is outside the representable range")]
pub struct TimestampOutOfRange(i64);

pub fn register_datetime(registry: &Registry) {
    registry.register(decode_datetime, encode_datetime);
}

fn decode_datetime(type_name: &str, raw: &Value) -> Result<Option<Typed>, HookError> {
    let opaque = match (type_name, raw) {
        (ISO_DATETIME, Value::String(s)) => Opaque::new(IsoDateTime(DateTime::parse_from_rfc3339(s)?)),
        (EPOCH_MILLIS, Value::Number(n)) => match n.as_i64() {
            Some(ms) => Opaque::new(EpochMillis(DateTime::from_timestamp_millis(ms).ok_or(TimestampOutOfRange(ms))?)),
            None => return Ok(None),
        },
        (EPOCH_MICROS, Value::Number(n)) => match n.as_i64() {
            Some(us) => Opaque::new(EpochMicros(DateTime::from_timestamp_micros(us).ok_or(TimestampOutOfRange(us))?)),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Some(Typed::Opaque(opaque)))
}

fn encode_datetime(value: &Opaque) -> Result<Option<Value>, HookError> {
    if let Some(IsoDateTime(dt)) = value.downcast_ref::<IsoDateTime>() {
        return Ok(Some(Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))));
    }
    if let Some(EpochMillis(dt)) = value.downcast_ref::<EpochMillis>() {
        return Ok(Some(Value::from(dt.timestamp_millis())));
    }
    if let Some(EpochMicros(dt)) = value.downcast_ref::<EpochMicros>() {
        return Ok(Some(Value::from(dt.timestamp_micros())));
    }
    Ok(None)
}
