use std::io::Write;

use pretty_assertions::assert_eq;
use serde_json::json;
use typed_json::{decode, encode, ErrorKind, ModelError, RecordKind, Ty, TypeModel, Typed};

const MODEL: &str = r#"{
    "records": [
        {
            "name": "CountingModel",
            "fields": [
                { "name": "count", "type": "integer" },
                { "name": "childs", "type": { "one_of": [{ "mapping": { "record": "CountingModel" } }, "null"] } }
            ]
        },
        {
            "name": "Job",
            "kind": "attribute",
            "fields": [
                { "name": "status", "type": { "enum": "Status" } },
                { "name": "retries", "type": { "one_of": ["integer", "null"] }, "default": 3 },
                { "name": "tags", "type": { "sequence": "text" } }
            ]
        }
    ],
    "enums": [
        { "name": "Status", "members": [{ "name": "ok", "value": "ok" }, { "name": "failed", "value": 1 }] }
    ]
}"#;

#[test]
fn model_loaded_from_disk_drives_decoding() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MODEL.as_bytes()).unwrap();
    let bytes = std::fs::read(file.path()).unwrap();
    let model = TypeModel::from_json_slice(&bytes).unwrap();

    assert_eq!(model.record("Job").map(|r| r.kind), Some(RecordKind::Attribute));
    assert_eq!(model.enums().count(), 1);

    let typed = decode(&model, &Ty::record("Job"), &json!({ "status": 1, "tags": ["a"] })).unwrap();
    match typed.get("status") {
        Some(Typed::Enum(member)) => assert_eq!(member.member(), "failed"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(typed.get("retries"), Some(&Typed::Integer(3)));
    assert_eq!(encode(&typed).unwrap(), json!({ "status": 1, "retries": 3, "tags": ["a"] }));
}

#[test]
fn self_referencing_record_from_model_file() {
    let model = TypeModel::from_json_str(MODEL).unwrap();
    let raw = json!({ "count": 1, "childs": { "a": { "count": 2, "childs": null } } });
    let typed = decode(&model, &Ty::record("CountingModel"), &raw).unwrap();
    assert_eq!(encode(&typed).unwrap(), raw);

    let err = decode(&model, &Ty::record("Job"), &json!({ "status": "failed", "tags": [] })).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMatchingEnumMember);
}

#[test]
fn model_file_with_dangling_reference_is_rejected() {
    let src = r#"{ "records": [ { "name": "A", "fields": [ { "name": "b", "type": { "record": "B" } } ] } ] }"#;
    assert!(matches!(TypeModel::from_json_str(src), Err(ModelError::UnknownRecord { name, .. }) if name == "B"));
}

#[test]
fn model_file_with_unknown_keys_is_rejected() {
    let src = r#"{ "records": [], "types": [] }"#;
    assert!(matches!(TypeModel::from_json_str(src), Err(ModelError::Parse { .. })));
}
