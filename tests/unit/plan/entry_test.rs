use crate::support::{describe, object_config, test_config};
use orgbridge::config::Operation;
use orgbridge::model::ObjectDescribe;
use orgbridge::plan::Plan;
use std::collections::HashMap;

fn describes(list: Vec<ObjectDescribe>) -> HashMap<String, ObjectDescribe> {
    list.into_iter().map(|d| (d.name.clone(), d)).collect()
}

#[test]
fn insert_forces_business_key_to_identifier() {
    let config = test_config(vec![object_config(
        "SELECT Id, Name FROM Account",
        Operation::Insert,
    )]);
    let source = describes(vec![describe("Account", &["Name"], &[])]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    assert_eq!(plan.get("Account").unwrap().external_id, "Id");
}

#[test]
fn upsert_falls_back_to_run_default_business_key() {
    let config = test_config(vec![object_config(
        "SELECT Id, Name FROM Account",
        Operation::Upsert,
    )]);
    let source = describes(vec![describe("Account", &["Name"], &[])]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    // settings.default_external_id is "Name"
    assert_eq!(plan.get("Account").unwrap().external_id, "Name");
}

#[test]
fn dependency_map_is_derived_from_reference_fields() {
    let config = test_config(vec![
        object_config("SELECT Id, Name FROM Account", Operation::Upsert),
        object_config(
            "SELECT Id, LastName, AccountId FROM Contact",
            Operation::Upsert,
        ),
    ]);
    let source = describes(vec![
        describe("Account", &["Name"], &[]),
        describe("Contact", &["LastName", "Name"], &[("AccountId", "Account")]),
    ]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    let contact = plan.get("Contact").unwrap();
    assert!(contact.depends_on("Account"));
    assert_eq!(contact.dependencies["Account"], vec!["AccountId"]);
}

#[test]
fn referenced_object_outside_the_set_gets_a_readonly_stand_in() {
    let config = test_config(vec![object_config(
        "SELECT Id, LastName, AccountId FROM Contact",
        Operation::Upsert,
    )]);
    let source = describes(vec![
        describe("Contact", &["LastName", "Name"], &[("AccountId", "Account")]),
        describe("Account", &["Name"], &[]),
    ]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    let stand_in = plan.get("Account").expect("stand-in synthesized");
    assert!(stand_in.synthesized);
    assert!(stand_in.all_records);
    assert_eq!(stand_in.operation, Operation::Readonly);
    assert!(stand_in.query.fields.contains(&"Id".to_string()));
    assert!(stand_in.query.fields.contains(&"Name".to_string()));
    assert!(stand_in.query.where_clause.is_none());
}

#[test]
fn stand_in_keeps_its_key_field_when_the_describe_lacks_it() {
    let config = test_config(vec![object_config(
        "SELECT Id, LastName, AccountId FROM Contact",
        Operation::Upsert,
    )]);
    // The referenced object's describe resolves the identifier but not the
    // default business key
    let source = describes(vec![
        describe("Contact", &["LastName", "Name"], &[("AccountId", "Account")]),
        describe("Account", &[], &[]),
    ]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    let stand_in = plan.get("Account").unwrap();
    let names = stand_in.field_names();
    assert!(names.iter().any(|n| n == "Id"));
    assert!(names.iter().any(|n| n == "Name"));
}

#[test]
fn record_type_stand_in_uses_developer_name_and_object_type() {
    let config = test_config(vec![object_config(
        "SELECT Id, Name, RecordTypeId FROM Account",
        Operation::Upsert,
    )]);
    let source = describes(vec![describe(
        "Account",
        &["Name"],
        &[("RecordTypeId", "RecordType")],
    )]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    let rt = plan.get("RecordType").unwrap();
    assert_eq!(rt.external_id, "DeveloperName");
    assert!(rt.query.fields.contains(&"SobjectType".to_string()));
}

#[test]
fn missing_source_field_is_a_metadata_error() {
    let config = test_config(vec![object_config(
        "SELECT Id, Name, Nonexistent__c FROM Account",
        Operation::Upsert,
    )]);
    let source = describes(vec![describe("Account", &["Name"], &[])]);
    let target = source.clone();

    let err = Plan::build(&config, &source, &target).unwrap_err();
    assert!(err.to_string().contains("Nonexistent__c"));
}

#[test]
fn excluded_objects_are_dropped_from_the_plan() {
    let mut excluded = object_config("SELECT Id, Name FROM Account", Operation::Upsert);
    excluded.excluded = true;
    let config = test_config(vec![
        excluded,
        object_config("SELECT Id, LastName, Name FROM Contact", Operation::Upsert),
    ]);
    let source = describes(vec![
        describe("Account", &["Name"], &[]),
        describe("Contact", &["LastName", "Name"], &[]),
    ]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    assert!(plan.get("Account").is_none());
    assert!(plan.get("Contact").is_some());
}

#[test]
fn complex_business_keys_are_detected() {
    let mut cfg = object_config("SELECT Id, Name FROM Account", Operation::Upsert);
    cfg.external_id = Some("Parent.Name".to_string());
    let config = test_config(vec![cfg]);
    let source = describes(vec![describe("Account", &["Name"], &[])]);
    let target = source.clone();

    let plan = Plan::build(&config, &source, &target).unwrap();
    assert!(plan.get("Account").unwrap().has_complex_external_id());
}
