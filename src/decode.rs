//! Decode engine.
//!
//! Walks a type descriptor and a raw JSON value in lockstep and produces a
//! [`Typed`] tree, or the first error met on the way. Unions are resolved
//! greedily: alternatives are tried in declaration order and the first one
//! that decodes is taken (see [`UnionPolicy`] for the strict variant), so
//! declare alternatives from most to least specific.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::classify::{classify, RecordShape};
use crate::error::{Error, Trail};
use crate::ir::{ScalarValue, Ty, TypeModel};
use crate::options::{DecodeOptions, UnionPolicy};
use crate::registry::Registry;
use crate::value::{EnumValue, Typed};

/// Decodes `raw` as an instance of `record_type` using the global registry
/// and default options. `model` must be valid, see [`TypeModel::validate`].
pub fn decode(model: &TypeModel, record_type: &Ty, raw: &Value) -> Result<Typed, Error> {
    Decoder::new(model).decode(record_type, raw)
}

#[derive(Clone, Copy)]
pub struct Decoder<'a> {
    model: &'a TypeModel,
    registry: &'a Registry,
    options: DecodeOptions,
}

// A missing key is not the same thing as an explicit null.
#[derive(Clone, Copy)]
enum Slot<'v> {
    Absent,
    Present(&'v Value),
}

struct Ctx<'t> {
    record: &'t str,  // innermost enclosing record, for messages
    trail: Trail<'t>,
}

impl Ctx<'_> {
    fn key<'c>(&'c self, key: &'c str) -> Ctx<'c> {
        Ctx { record: self.record, trail: self.trail.key(key) }
    }

    fn index(&self, index: usize) -> Ctx<'_> {
        Ctx { record: self.record, trail: self.trail.index(index) }
    }

    fn mismatch(&self, ty: &Ty, value: &Value) -> Error {
        Error::TypeMismatch {
            record: self.record.to_owned(),
            path: self.trail.to_path(),
            expected: ty.to_string(),
            actual: json_kind(value).to_owned(),
        }
    }

    fn unsupported(&self, ty: &Ty, value: &Value) -> Error {
        Error::UnsupportedType {
            path: self.trail.to_path(),
            ty: ty.to_string(),
            actual: json_kind(value).to_owned(),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "real",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

impl<'a> Decoder<'a> {
    pub fn new(model: &'a TypeModel) -> Self {
        Self { model, registry: Registry::global(), options: DecodeOptions::default() }
    }

    pub fn with_registry(self, registry: &'a Registry) -> Self {
        Self { registry, ..self }
    }

    pub fn with_options(self, options: DecodeOptions) -> Self {
        Self { options, ..self }
    }

    /// The model is expected to have passed [`TypeModel::validate`]; debug
    /// builds check this and panic otherwise.
    pub fn decode(&self, record_type: &Ty, raw: &Value) -> Result<Typed, Error> {
        #[cfg(debug_assertions)]
        if let Err(err) = self.model.validate() {
            panic!("decoding against an invalid type model: {err}");
        }
        let shape = classify(self.model, record_type)
            .ok_or_else(|| Error::UnsupportedRootType { ty: record_type.to_string() })?;
        debug!(record = shape.name(), kind = ?shape.kind(), "decoding document");
        self.decode_record(shape, raw, &Trail::Root)
    }

    fn decode_record(&self, shape: RecordShape<'a>, raw: &Value, trail: &Trail<'_>) -> Result<Typed, Error> {
        let Value::Object(map) = raw else {
            return Err(Error::NotAMapping {
                record: shape.name().to_owned(),
                path: trail.to_path(),
                actual: json_kind(raw).to_owned(),
            });
        };

        let mut values = Vec::with_capacity(shape.fields().len());
        for field in shape.fields() {
            let slot = map.get(&field.name).map_or(Slot::Absent, Slot::Present);
            let ctx = Ctx { record: shape.name(), trail: trail.key(&field.name) };
            let value = self.decode_value(&field.ty, slot, shape.default(field), &ctx)?;
            values.push((field.name.clone(), value));
        }
        Ok(shape.construct(values))
    }

    fn decode_value(&self, ty: &Ty, slot: Slot<'_>, default: Option<&Value>, ctx: &Ctx<'_>) -> Result<Typed, Error> {
        let value = match slot {
            Slot::Present(value) if !value.is_null() => value,
            _ => return self.decode_missing(ty, slot, default, ctx),
        };

        match ty {
            Ty::Null => Err(ctx.mismatch(ty, value)),
            Ty::Bool => value.as_bool().map(Typed::Bool).ok_or_else(|| ctx.mismatch(ty, value)),
            Ty::Integer => value
                .as_i64()
                .map(Typed::Integer)
                .or_else(|| value.as_u64().map(Typed::UInt))
                .ok_or_else(|| ctx.mismatch(ty, value)),
            Ty::Real => {
                // integers are not silently widened
                let real = if value.is_f64() { value.as_f64() } else { None };
                real.map(Typed::Real).ok_or_else(|| ctx.mismatch(ty, value))
            }
            Ty::Text => value
                .as_str()
                .map(|s| Typed::Text(s.to_owned()))
                .ok_or_else(|| ctx.mismatch(ty, value)),
            Ty::Sequence(item) => {
                let Value::Array(items) = value else { return Err(ctx.mismatch(ty, value)) };
                items
                    .iter()
                    .enumerate()
                    .map(|(i, x)| self.decode_value(item, Slot::Present(x), None, &ctx.index(i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Typed::List)
            }
            Ty::Mapping(item) => {
                let Value::Object(entries) = value else { return Err(ctx.mismatch(ty, value)) };
                entries
                    .iter()
                    .map(|(k, x)| Ok((k.clone(), self.decode_value(item, Slot::Present(x), None, &ctx.key(k))?)))
                    .collect::<Result<IndexMap<_, _>, Error>>()
                    .map(Typed::Map)
            }
            Ty::OneOf(arms) => self.decode_union(arms, value, ctx),
            Ty::Enum(name) => self.decode_enum(ty, name, value, ctx),
            Ty::Record(_) => match classify(self.model, ty) {
                Some(shape) => self.decode_record(shape, value, &ctx.trail),
                None => Err(ctx.unsupported(ty, value)),
            },
            Ty::Opaque(name) => match self.registry.try_decode(name, value) {
                Ok(Some(typed)) => Ok(typed),
                Ok(None) => Err(ctx.unsupported(ty, value)),
                Err(source) => Err(Error::ConverterFailed { path: ctx.trail.to_path(), ty: ty.to_string(), source }),
            },
        }
    }

    // Absent key or explicit null: fine for nullable types, which take the
    // field default when there is one.
    fn decode_missing(&self, ty: &Ty, slot: Slot<'_>, default: Option<&Value>, ctx: &Ctx<'_>) -> Result<Typed, Error> {
        if !ty.accepts_null() {
            let (record, path, expected) = (ctx.record.to_owned(), ctx.trail.to_path(), ty.to_string());
            return Err(match slot {
                Slot::Absent => Error::MissingRequiredField { record, path, expected },
                Slot::Present(_) => Error::NullNotAccepted { record, path, expected },
            });
        }
        match default {
            Some(default) => self.decode_value(ty, Slot::Present(default), None, ctx),
            None => Ok(Typed::Null),
        }
    }

    fn decode_union(&self, arms: &[Ty], value: &Value, ctx: &Ctx<'_>) -> Result<Typed, Error> {
        let mut matched: Vec<(&Ty, Typed)> = Vec::new();
        let mut deepest: Option<Error> = None;

        for arm in arms.iter().filter(|arm| **arm != Ty::Null) {
            match self.decode_value(arm, Slot::Present(value), None, ctx) {
                Ok(typed) if self.options.union_policy == UnionPolicy::FirstMatch => return Ok(typed),
                Ok(typed) => matched.push((arm, typed)),
                Err(err) => {
                    trace!(path = %ctx.trail, alternative = %arm, error = %err, "union alternative rejected");
                    if deepest.as_ref().is_none_or(|best| err.depth() > best.depth()) {
                        deepest = Some(err);
                    }
                }
            }
        }

        if matched.len() > 1 {
            return Err(Error::AmbiguousAlternative {
                record: ctx.record.to_owned(),
                path: ctx.trail.to_path(),
                alternatives: matched.iter().map(|(arm, _)| arm.to_string()).collect(),
            });
        }
        if let Some((_, typed)) = matched.pop() {
            return Ok(typed);
        }

        // An alternative whose shape matched but failed further down says more
        // than a flat "nothing matched".
        match deepest {
            Some(err) if err.depth() > ctx.trail.depth() => Err(err),
            _ => Err(Error::NoMatchingAlternative {
                record: ctx.record.to_owned(),
                path: ctx.trail.to_path(),
                alternatives: arms.iter().filter(|arm| **arm != Ty::Null).map(Ty::to_string).collect(),
                actual: json_kind(value).to_owned(),
            }),
        }
    }

    fn decode_enum(&self, ty: &Ty, name: &str, value: &Value, ctx: &Ctx<'_>) -> Result<Typed, Error> {
        let Some(enum_ty) = self.model.enumeration(name) else {
            return Err(ctx.unsupported(ty, value));
        };
        ScalarValue::from_json(value)
            .and_then(|scalar| enum_ty.member_for(&scalar))
            .map(|member| Typed::Enum(EnumValue::new(enum_ty, member)))
            .ok_or_else(|| Error::NoMatchingEnumMember {
                record: ctx.record.to_owned(),
                path: ctx.trail.to_path(),
                enum_name: name.to_owned(),
                actual: value.to_string(),
            })
    }
}
