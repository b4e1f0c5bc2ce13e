//! Typed JSON: decode untyped JSON documents into validated typed records
//! described by a [`TypeModel`], and encode them back.
//!
//! ```
//! use serde_json::json;
//! use typed_json::{decode, encode, RecordTy, Ty, TypeModel};
//!
//! let mut model = TypeModel::new();
//! model.define(
//!     RecordTy::positional("CountingModel")
//!         .field("count", Ty::Integer)
//!         .field("childs", Ty::optional(Ty::mapping(Ty::record("CountingModel")))),
//! );
//!
//! let raw = json!({ "count": 5, "childs": { "abc": { "count": 2 } } });
//! let typed = decode(&model, &Ty::record("CountingModel"), &raw).unwrap();
//! assert_eq!(
//!     encode(&typed).unwrap(),
//!     json!({ "count": 5, "childs": { "abc": { "count": 2, "childs": null } } })
//! );
//! ```
pub mod classify;
pub mod converters;
pub mod decode;
pub mod encode;
pub mod error;
pub mod ir;
pub mod options;
mod path_de;
pub mod registry;
pub mod value;

pub use classify::{classify, RecordShape};
pub use decode::{decode, Decoder};
pub use encode::{encode, Encoder};
pub use error::{Error, ErrorKind, ModelError, Path};
pub use ir::{EnumMember, EnumTy, Field, RecordKind, RecordTy, ScalarValue, Ty, TypeModel};
pub use options::{DecodeOptions, UnionPolicy};
pub use registry::{register, HookError, Registry};
pub use value::{AssignError, EnumValue, Opaque, Record, Typed};
