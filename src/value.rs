//! Typed value tree produced by decoding and consumed by encoding.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::ir::{EnumMember, EnumTy, RecordKind, ScalarValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Typed {
    Null,
    Bool(bool),
    Integer(i64),
    UInt(u64),  // integers above `i64::MAX`
    Real(f64),
    Text(String),
    List(Vec<Typed>),
    Map(IndexMap<String, Typed>),  // also what a structural record decodes to
    Enum(EnumValue),
    Record(Record),
    Opaque(Opaque),
}

impl Typed {
    pub fn kind_name(&self) -> String {
        match self {
            Typed::Null => "null".into(),
            Typed::Bool(_) => "bool".into(),
            Typed::Integer(_) | Typed::UInt(_) => "integer".into(),
            Typed::Real(_) => "real".into(),
            Typed::Text(_) => "text".into(),
            Typed::List(_) => "list".into(),
            Typed::Map(_) => "mapping".into(),
            Typed::Enum(e) => format!("enum {}", e.enum_name),
            Typed::Record(r) => format!("record {}", r.name),
            Typed::Opaque(o) => o.type_name().to_owned(),
        }
    }

    /// Field of a record or entry of a mapping.
    pub fn get(&self, key: &str) -> Option<&Typed> {
        match self {
            Typed::Record(r) => r.get(key),
            Typed::Map(m) => m.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Typed::Null) }

    pub fn as_record(&self) -> Option<&Record> {
        match self { Typed::Record(r) => Some(r), _ => None }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self { Typed::Record(r) => Some(r), _ => None }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self { Typed::Opaque(o) => Some(o), _ => None }
    }
}

// ------------------------------- Enums ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    enum_name: String,
    member: String,
    value: ScalarValue,
}

impl EnumValue {
    pub fn new(enum_ty: &EnumTy, member: &EnumMember) -> Self {
        Self {
            enum_name: enum_ty.name.clone(),
            member: member.name.clone(),
            value: member.value.clone(),
        }
    }

    pub fn enum_name(&self) -> &str { &self.enum_name }
    pub fn member(&self) -> &str { &self.member }
    pub fn value(&self) -> &ScalarValue { &self.value }
}

// ------------------------------ Records ---------------------------------- //

/// Populated instance of a positional or attribute record. Field order is the
/// order values were bound in, which decode keeps equal to declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    kind: RecordKind,
    fields: IndexMap<String, Typed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("record `{record}` is positional and cannot be modified")]
    ReadOnly { record: String },
    #[error("record `{record}` has no field `{field}`")]
    UnknownField { record: String, field: String },
}

impl Record {
    pub fn new<K: Into<String>>(
        name: impl Into<String>,
        kind: RecordKind,
        fields: impl IntoIterator<Item = (K, Typed)>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> RecordKind { self.kind }
    pub fn get(&self, field: &str) -> Option<&Typed> { self.fields.get(field) }
    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Typed)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Rebinds an existing field and returns the previous value.
    pub fn set(&mut self, field: &str, value: Typed) -> Result<Typed, AssignError> {
        if self.kind == RecordKind::Positional {
            return Err(AssignError::ReadOnly { record: self.name.clone() });
        }
        match self.fields.get_mut(field) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(AssignError::UnknownField {
                record: self.name.clone(),
                field: field.to_owned(),
            }),
        }
    }
}

// ------------------------------- Opaque ---------------------------------- //

/// Anything that can sit behind [`Opaque`]. Blanket-implemented; there is no
/// need to implement it by hand.
pub trait OpaqueData: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn OpaqueData) -> bool;
}

impl<T: Any + fmt::Debug + PartialEq + Send + Sync> OpaqueData for T {
    fn as_any(&self) -> &dyn Any { self }

    fn dyn_eq(&self, other: &dyn OpaqueData) -> bool {
        OpaqueData::as_any(other).downcast_ref::<T>().is_some_and(|other| other == self)
    }
}

/// Leaf value only a registered converter knows how to encode.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn OpaqueData>,
}

impl Opaque {
    pub fn new<T: OpaqueData>(value: T) -> Self {
        Self { type_name: std::any::type_name::<T>(), inner: Arc::new(value) }
    }

    pub fn type_name(&self) -> &'static str { self.type_name }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let inner: &dyn OpaqueData = &*self.inner;
        inner.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool { self.downcast_ref::<T>().is_some() }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        let (lhs, rhs): (&dyn OpaqueData, &dyn OpaqueData) = (&*self.inner, &*other.inner);
        lhs.dyn_eq(rhs)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.inner).finish()
    }
}
