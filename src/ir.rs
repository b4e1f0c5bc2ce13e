// Type descriptors for the codec. Pure data, no decoding behavior here.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ModelError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Declared type of a field.
///
/// Records and enums are referenced by name and resolved through a
/// [`TypeModel`], which is what lets a record mention itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ty {
    Null,                    // the nullable marker; normally an arm of `OneOf`
    Bool,
    Integer,
    Real,
    Text,
    Sequence(Box<Ty>),
    Mapping(Box<Ty>),        // keys are always text
    OneOf(Vec<Ty>),          // ordered; first alternative that decodes wins
    Enum(String),
    Record(String),
    Opaque(String),          // only the converter registry understands these
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Bound by position at construction, read-only afterwards.
    #[default]
    Positional,
    /// No instance of its own: decodes to a plain mapping with every declared key.
    Structural,
    /// Named attributes, mutable after construction.
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Ty,
    /// Used when the field is nullable and missing (or null) in the input.
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordTy {
    pub name: String,
    #[serde(default)]
    pub kind: RecordKind,
    pub fields: Vec<Field>,  // declaration order
}

/// Underlying value of an enum member. Equality is exact: `1` and `1.0` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "Value")]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    UInt(u64),  // only for values above `i64::MAX`
    Real(OrderedFloat<f64>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumMember {
    pub name: String,
    pub value: ScalarValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumTy {
    pub name: String,
    pub members: Vec<EnumMember>,
}

/// Named record and enum declarations that [`Ty::Record`] and [`Ty::Enum`] point into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeModel {
    records: IndexMap<String, RecordTy>,
    enums: IndexMap<String, EnumTy>,
}

// On-disk layout of a model file.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelDoc {
    #[serde(default)]
    records: Vec<RecordTy>,
    #[serde(default)]
    enums: Vec<EnumTy>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Ty {
    pub fn sequence(item: Ty) -> Self { Ty::Sequence(Box::new(item)) }
    pub fn mapping(value: Ty) -> Self { Ty::Mapping(Box::new(value)) }
    pub fn record(name: impl Into<String>) -> Self { Ty::Record(name.into()) }
    pub fn enumeration(name: impl Into<String>) -> Self { Ty::Enum(name.into()) }
    pub fn opaque(name: impl Into<String>) -> Self { Ty::Opaque(name.into()) }

    pub fn one_of(alternatives: impl IntoIterator<Item = Ty>) -> Self {
        Ty::OneOf(alternatives.into_iter().collect())
    }

    /// `T | null`. An existing union gains the null arm instead of being nested.
    pub fn optional(inner: Ty) -> Self {
        match inner {
            Ty::OneOf(mut arms) => {
                if !arms.contains(&Ty::Null) {
                    arms.push(Ty::Null);
                }
                Ty::OneOf(arms)
            }
            Ty::Null => Ty::Null,
            other => Ty::OneOf(vec![other, Ty::Null]),
        }
    }

    pub fn accepts_null(&self) -> bool {
        match self {
            Ty::Null => true,
            Ty::OneOf(arms) => arms.iter().any(Ty::accepts_null),
            _ => false,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Null => f.write_str("null"),
            Ty::Bool => f.write_str("bool"),
            Ty::Integer => f.write_str("integer"),
            Ty::Real => f.write_str("real"),
            Ty::Text => f.write_str("text"),
            Ty::Sequence(item) => write!(f, "list[{item}]"),
            Ty::Mapping(value) => write!(f, "map[text, {value}]"),
            Ty::OneOf(arms) => {
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 { f.write_str(" | ")?; }
                    match arm {
                        Ty::OneOf(_) => write!(f, "({arm})")?,
                        _ => write!(f, "{arm}")?,
                    }
                }
                Ok(())
            }
            Ty::Enum(name) => write!(f, "enum {name}"),
            Ty::Record(name) => write!(f, "record {name}"),
            Ty::Opaque(name) => write!(f, "opaque {name}"),
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Self { name: name.into(), ty, default: None }
    }
}

impl RecordTy {
    pub fn new(name: impl Into<String>, kind: RecordKind) -> Self {
        Self { name: name.into(), kind, fields: Vec::new() }
    }
    pub fn positional(name: impl Into<String>) -> Self { Self::new(name, RecordKind::Positional) }
    pub fn structural(name: impl Into<String>) -> Self { Self::new(name, RecordKind::Structural) }
    pub fn attribute(name: impl Into<String>) -> Self { Self::new(name, RecordKind::Attribute) }

    pub fn field(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    pub fn field_default(mut self, name: impl Into<String>, ty: Ty, default: impl Into<Value>) -> Self {
        self.fields.push(Field { default: Some(default.into()), ..Field::new(name, ty) });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl ScalarValue {
    /// `None` for null and containers.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            Value::Number(n) if n.is_f64() => n.as_f64().map(|f| ScalarValue::Real(OrderedFloat(f))),
            Value::Number(n) => n.as_i64().map(ScalarValue::Integer).or_else(|| n.as_u64().map(ScalarValue::UInt)),
            Value::String(s) => Some(ScalarValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Integer(i) => Value::from(*i),
            ScalarValue::UInt(u) => Value::from(*u),
            ScalarValue::Real(f) => serde_json::Number::from_f64(f.0).map_or(Value::Null, Value::Number),
            ScalarValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl TryFrom<Value> for ScalarValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        ScalarValue::from_json(&value)
            .ok_or_else(|| format!("enum member values must be bool, integer, real or text, got {value}"))
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self { ScalarValue::Bool(b) }
}
impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self { ScalarValue::Integer(i) }
}
impl From<u64> for ScalarValue {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(ScalarValue::UInt(u), ScalarValue::Integer)
    }
}
impl From<f64> for ScalarValue {
    fn from(f: f64) -> Self { ScalarValue::Real(OrderedFloat(f)) }
}
impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self { ScalarValue::Text(s.to_owned()) }
}
impl From<String> for ScalarValue {
    fn from(s: String) -> Self { ScalarValue::Text(s) }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl EnumTy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), members: Vec::new() }
    }

    pub fn member(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.members.push(EnumMember { name: name.into(), value: value.into() });
        self
    }

    /// First member whose underlying value equals `value`.
    pub fn member_for(&self, value: &ScalarValue) -> Option<&EnumMember> {
        self.members.iter().find(|m| &m.value == value)
    }
}

impl TypeModel {
    pub fn new() -> Self { Self::default() }

    /// Adds a record, replacing any earlier declaration with the same name.
    pub fn define(&mut self, record: RecordTy) -> &mut Self {
        self.records.insert(record.name.clone(), record);
        self
    }

    pub fn define_enum(&mut self, enum_ty: EnumTy) -> &mut Self {
        self.enums.insert(enum_ty.name.clone(), enum_ty);
        self
    }

    pub fn record(&self, name: &str) -> Option<&RecordTy> { self.records.get(name) }
    pub fn enumeration(&self, name: &str) -> Option<&EnumTy> { self.enums.get(name) }
    pub fn records(&self) -> impl Iterator<Item = &RecordTy> { self.records.values() }
    pub fn enums(&self) -> impl Iterator<Item = &EnumTy> { self.enums.values() }

    pub fn from_json_str(src: &str) -> Result<Self, ModelError> {
        Self::from_doc(crate::path_de::from_str_with_path(src)?)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        Self::from_doc(crate::path_de::from_slice_with_path(bytes)?)
    }

    fn from_doc(doc: ModelDoc) -> Result<Self, ModelError> {
        let mut model = TypeModel::new();
        for record in doc.records {
            if model.records.contains_key(&record.name) {
                return Err(ModelError::DuplicateRecord(record.name));
            }
            model.define(record);
        }
        for enum_ty in doc.enums {
            if model.enums.contains_key(&enum_ty.name) {
                return Err(ModelError::DuplicateEnum(enum_ty.name));
            }
            model.define_enum(enum_ty);
        }
        model.validate()?;
        Ok(model)
    }

    /// Checks references, uniqueness and default placement. Defaults are not
    /// decoded here; a default that does not fit its type fails at decode time.
    pub fn validate(&self) -> Result<(), ModelError> {
        for enum_ty in self.enums.values() {
            if enum_ty.members.is_empty() {
                return Err(ModelError::EmptyEnum(enum_ty.name.clone()));
            }
            let mut seen = HashSet::new();
            for member in &enum_ty.members {
                if !seen.insert(member.name.as_str()) {
                    return Err(ModelError::DuplicateMember {
                        name: enum_ty.name.clone(),
                        member: member.name.clone(),
                    });
                }
            }
        }

        for record in self.records.values() {
            let mut seen = HashSet::new();
            for field in &record.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(ModelError::DuplicateField {
                        record: record.name.clone(),
                        field: field.name.clone(),
                    });
                }
                self.check_refs(record, field, &field.ty)?;
                if field.default.is_some() {
                    if record.kind == RecordKind::Structural {
                        return Err(ModelError::DefaultOnStructuralField {
                            record: record.name.clone(),
                            field: field.name.clone(),
                        });
                    }
                    if !field.ty.accepts_null() {
                        return Err(ModelError::DefaultOnRequiredField {
                            record: record.name.clone(),
                            field: field.name.clone(),
                            ty: field.ty.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_refs(&self, record: &RecordTy, field: &Field, ty: &Ty) -> Result<(), ModelError> {
        match ty {
            Ty::Sequence(inner) | Ty::Mapping(inner) => self.check_refs(record, field, inner),
            Ty::OneOf(arms) => {
                if arms.is_empty() {
                    return Err(ModelError::EmptyUnion {
                        record: record.name.clone(),
                        field: field.name.clone(),
                    });
                }
                arms.iter().try_for_each(|arm| self.check_refs(record, field, arm))
            }
            Ty::Record(name) if !self.records.contains_key(name) => Err(ModelError::UnknownRecord {
                record: record.name.clone(),
                field: field.name.clone(),
                name: name.clone(),
            }),
            Ty::Enum(name) if !self.enums.contains_key(name) => Err(ModelError::UnknownEnum {
                record: record.name.clone(),
                field: field.name.clone(),
                name: name.clone(),
            }),
            _ => Ok(()),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
