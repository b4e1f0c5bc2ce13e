//! Record classification.
//!
//! Decides which record variant a descriptor names, and gives the engines one
//! accessor surface over all three: fields in declaration order, per-field
//! defaults, and construction of the populated value.

use serde_json::Value;

use crate::ir::{Field, RecordKind, RecordTy, Ty, TypeModel};
use crate::value::{Record, Typed};

#[derive(Debug, Clone, Copy)]
pub enum RecordShape<'m> {
    Positional(&'m RecordTy),
    Structural(&'m RecordTy),
    Attribute(&'m RecordTy),
}

/// `None` when `ty` is not a record reference or names no record in `model`.
pub fn classify<'m>(model: &'m TypeModel, ty: &Ty) -> Option<RecordShape<'m>> {
    let Ty::Record(name) = ty else { return None };
    let decl = model.record(name)?;
    Some(match decl.kind {
        RecordKind::Positional => RecordShape::Positional(decl),
        RecordKind::Structural => RecordShape::Structural(decl),
        RecordKind::Attribute => RecordShape::Attribute(decl),
    })
}

/// Runtime counterpart used by encode: is this value a record instance?
/// Structural records are plain mappings at runtime and answer `false`.
pub fn is_record_value(value: &Typed) -> bool {
    matches!(value, Typed::Record(_))
}

impl<'m> RecordShape<'m> {
    fn decl(&self) -> &'m RecordTy {
        match *self {
            RecordShape::Positional(decl) | RecordShape::Structural(decl) | RecordShape::Attribute(decl) => decl,
        }
    }

    pub fn name(&self) -> &'m str { &self.decl().name }
    pub fn kind(&self) -> RecordKind { self.decl().kind }
    pub fn fields(&self) -> &'m [Field] { &self.decl().fields }

    pub fn default(&self, field: &'m Field) -> Option<&'m Value> {
        match self {
            RecordShape::Structural(_) => None,
            RecordShape::Positional(_) | RecordShape::Attribute(_) => field.default.as_ref(),
        }
    }

    /// Builds the instance from values given in declaration order.
    pub fn construct(&self, values: Vec<(String, Typed)>) -> Typed {
        match self {
            RecordShape::Structural(_) => Typed::Map(values.into_iter().collect()),
            RecordShape::Positional(decl) | RecordShape::Attribute(decl) => {
                Typed::Record(Record::new(decl.name.clone(), decl.kind, values))
            }
        }
    }
}
