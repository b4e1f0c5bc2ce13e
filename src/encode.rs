//! Encode engine: typed values back to JSON.
//!
//! Driven only by the runtime shape of the value; no descriptor is needed.
//! Every record field is written out, including nulls and fields that were
//! filled from a default when decoding.

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::classify::is_record_value;
use crate::error::{Error, Trail};
use crate::registry::Registry;
use crate::value::{Opaque, Typed};

/// Encodes a record instance or mapping with the global registry.
pub fn encode(value: &Typed) -> Result<Value, Error> {
    Encoder::new().encode(value)
}

#[derive(Clone, Copy)]
pub struct Encoder<'a> {
    registry: &'a Registry,
}

impl Default for Encoder<'static> {
    fn default() -> Self {
        Self { registry: Registry::global() }
    }
}

impl Encoder<'static> {
    pub fn new() -> Self { Self::default() }
}

impl<'a> Encoder<'a> {
    pub fn with_registry<'r>(self, registry: &'r Registry) -> Encoder<'r> {
        Encoder { registry }
    }

    pub fn encode(&self, value: &Typed) -> Result<Value, Error> {
        if !is_record_value(value) && !matches!(value, Typed::Map(_)) {
            return Err(Error::UnsupportedRootType { ty: value.kind_name() });
        }
        debug!(root = %value.kind_name(), "encoding value");
        self.encode_value(value, &Trail::Root)
    }

    fn encode_value(&self, value: &Typed, trail: &Trail<'_>) -> Result<Value, Error> {
        Ok(match value {
            Typed::Null => Value::Null,
            Typed::Bool(b) => Value::Bool(*b),
            Typed::Integer(i) => Value::from(*i),
            Typed::UInt(u) => Value::from(*u),
            Typed::Real(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| Error::UnsupportedType {
                path: trail.to_path(),
                ty: "finite real".to_owned(),
                actual: f.to_string(),
            })?,
            Typed::Text(s) => Value::String(s.clone()),
            Typed::Record(record) => Value::Object(
                record
                    .fields()
                    .map(|(k, v)| Ok((k.to_owned(), self.encode_value(v, &trail.key(k))?)))
                    .collect::<Result<Map<_, _>, Error>>()?,
            ),
            Typed::List(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.encode_value(v, &trail.index(i)))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Typed::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.encode_value(v, &trail.key(k))?)))
                    .collect::<Result<Map<_, _>, Error>>()?,
            ),
            Typed::Enum(member) => member.value().to_json(),
            Typed::Opaque(opaque) => self.encode_opaque(opaque, trail)?,
        })
    }

    fn encode_opaque(&self, opaque: &Opaque, trail: &Trail<'_>) -> Result<Value, Error> {
        match self.registry.try_encode(opaque) {
            Ok(Some(json)) => Ok(json),
            Ok(None) => Err(Error::UnsupportedType {
                path: trail.to_path(),
                ty: "registered opaque type".to_owned(),
                actual: opaque.type_name().to_owned(),
            }),
            Err(source) => Err(Error::ConverterFailed {
                path: trail.to_path(),
                ty: opaque.type_name().to_owned(),
                source,
            }),
        }
    }
}
