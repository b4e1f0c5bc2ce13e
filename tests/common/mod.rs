#![allow(dead_code)]

use std::sync::Once;

use indexmap::IndexMap;
use typed_json::converters::{register_datetime, EPOCH_MICROS, EPOCH_MILLIS, ISO_DATETIME};
use typed_json::{EnumTy, Record, RecordKind, RecordTy, Registry, Ty, Typed, TypeModel};

/// The records the codec is exercised against.
pub fn fixtures() -> TypeModel {
    let mut model = TypeModel::new();
    model
        .define(
            RecordTy::positional("CountingModel")
                .field("count", Ty::Integer)
                .field("childs", Ty::optional(Ty::mapping(Ty::record("CountingModel")))),
        )
        .define(
            RecordTy::structural("CountingDict")
                .field("count", Ty::Integer)
                .field("childs", Ty::optional(Ty::mapping(Ty::record("CountingDict")))),
        )
        .define(RecordTy::structural("Range").field("from", Ty::Integer).field("to", Ty::Integer))
        .define(
            RecordTy::positional("DataModel")
                .field("string", Ty::Text)
                .field("list_str", Ty::sequence(Ty::Text))
                .field("num", Ty::Integer)
                .field("list_num", Ty::sequence(Ty::Real))
                .field("data3d", Ty::sequence(Ty::sequence(Ty::Integer)))
                .field("range_num", Ty::optional(Ty::record("Range")))
                .field("counting", Ty::mapping(Ty::record("CountingModel"))),
        )
        .define(
            RecordTy::positional("TimeData")
                .field("iso", Ty::opaque(ISO_DATETIME))
                .field("mili", Ty::opaque(EPOCH_MILLIS))
                .field("micro", Ty::opaque(EPOCH_MICROS)),
        )
        .define(
            RecordTy::positional("OptionalInside")
                .field_default("not_accept", Ty::optional(Ty::one_of([Ty::mapping(Ty::Integer), Ty::Integer])), 0)
                .field_default(
                    "accept",
                    Ty::optional(Ty::one_of([Ty::mapping(Ty::optional(Ty::Integer)), Ty::Integer])),
                    0,
                ),
        )
        .define(RecordTy::positional("Defaulted").field_default("field", Ty::optional(Ty::Integer), 0))
        .define(RecordTy::positional("GenericModel").field("ite", Ty::opaque("iterable")))
        .define(RecordTy::attribute("Counter").field("count", Ty::Integer).field("label", Ty::optional(Ty::Text)))
        .define(RecordTy::positional("Reply").field("status", Ty::enumeration("Status")))
        .define_enum(EnumTy::new("Status").member("ok", "ok").member("error", "error"));
    model.validate().expect("fixture model is valid");
    model
}

/// Registers the datetime converters with the global registry once per test binary.
pub fn install_datetime_converters() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| register_datetime(Registry::global()));
}

pub fn counting_model(count: i64, childs: Option<Vec<(&str, Typed)>>) -> Typed {
    Typed::Record(Record::new(
        "CountingModel",
        RecordKind::Positional,
        [("count", Typed::Integer(count)), ("childs", childs.map_or(Typed::Null, map))],
    ))
}

pub fn counting_dict(count: i64, childs: Option<Vec<(&str, Typed)>>) -> Typed {
    map(vec![("count", Typed::Integer(count)), ("childs", childs.map_or(Typed::Null, map))])
}

pub fn map(entries: Vec<(&str, Typed)>) -> Typed {
    Typed::Map(entries.into_iter().map(|(k, v)| (k.to_owned(), v)).collect::<IndexMap<_, _>>())
}

pub fn text(s: &str) -> Typed {
    Typed::Text(s.to_owned())
}
