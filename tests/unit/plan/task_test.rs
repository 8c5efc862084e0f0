use crate::support::{describe, object_config, test_config};
use orgbridge::config::Operation;
use orgbridge::model::ObjectDescribe;
use orgbridge::plan::{build_execution_order, build_tasks, Plan, Task};
use std::collections::HashMap;

fn build(
    objects: Vec<orgbridge::config::ObjectConfig>,
    source: Vec<ObjectDescribe>,
) -> (Plan, Vec<Task>) {
    let config = test_config(objects);
    let source: HashMap<String, ObjectDescribe> =
        source.into_iter().map(|d| (d.name.clone(), d)).collect();
    let plan = Plan::build(&config, &source, &source.clone()).unwrap();
    let order = build_execution_order(&plan);
    let tasks = build_tasks(&plan, &order);
    (plan, tasks)
}

#[test]
fn companion_columns_carry_the_parent_business_key() {
    let (_, tasks) = build(
        vec![
            object_config("SELECT Id, Name FROM Account", Operation::Upsert),
            object_config(
                "SELECT Id, LastName, AccountId FROM Contact",
                Operation::Upsert,
            ),
        ],
        vec![
            describe("Account", &["Name"], &[]),
            describe("Contact", &["LastName", "Name"], &[("AccountId", "Account")]),
        ],
    );

    let contact = tasks.iter().find(|t| t.name == "Contact").unwrap();
    let account_pos = tasks.iter().position(|t| t.name == "Account").unwrap();
    let fk = contact
        .fields
        .iter()
        .find(|f| f.name == "AccountId")
        .unwrap();
    assert_eq!(fk.ext_id_column.as_deref(), Some("Account.Name"));
    assert_eq!(fk.parent_task, Some(account_pos));
    assert_eq!(fk.parent_key_field.as_deref(), Some("Name"));
    assert!(fk.is_parent_before);
}

#[test]
fn custom_reference_uses_relationship_suffix() {
    let (_, tasks) = build(
        vec![
            object_config("SELECT Id, Name FROM Program__c", Operation::Upsert),
            object_config(
                "SELECT Id, Name, Program__c FROM Enrollment__c",
                Operation::Upsert,
            ),
        ],
        vec![
            describe("Program__c", &["Name"], &[]),
            describe("Enrollment__c", &["Name"], &[("Program__c", "Program__c")]),
        ],
    );

    let enrollment = tasks.iter().find(|t| t.name == "Enrollment__c").unwrap();
    let fk = enrollment
        .fields
        .iter()
        .find(|f| f.name == "Program__c")
        .unwrap();
    assert_eq!(fk.ext_id_column.as_deref(), Some("Program__r.Name"));
}

#[test]
fn self_reference_is_classified_backward() {
    let (_, tasks) = build(
        vec![object_config(
            "SELECT Id, Name, ManagerId FROM Employee__c",
            Operation::Insert,
        )],
        vec![describe(
            "Employee__c",
            &["Name"],
            &[("ManagerId", "Employee__c")],
        )],
    );

    let employee = &tasks[0];
    let fk = employee
        .fields
        .iter()
        .find(|f| f.name == "ManagerId")
        .unwrap();
    assert!(fk.is_reference());
    assert!(!fk.is_parent_before);
    assert_eq!(employee.forward_reference_fields().count(), 0);
    assert_eq!(employee.backward_reference_fields().count(), 1);
}

#[test]
fn full_query_projects_fields_plus_companions() {
    let (plan, tasks) = build(
        vec![
            object_config("SELECT Id, Name FROM Account", Operation::Upsert),
            object_config(
                "SELECT Id, LastName, AccountId FROM Contact WHERE Email != null",
                Operation::Upsert,
            ),
        ],
        vec![
            describe("Account", &["Name"], &[]),
            describe("Contact", &["LastName", "Name"], &[("AccountId", "Account")]),
        ],
    );

    let contact = tasks.iter().find(|t| t.name == "Contact").unwrap();
    let full = contact.full_query(&plan);
    assert!(full.fields.contains(&"AccountId".to_string()));
    assert!(full.fields.contains(&"Account.Name".to_string()));
    assert_eq!(full.where_clause.as_deref(), Some("Email != null"));
}

#[test]
fn delete_query_is_identifier_only() {
    let mut cfg = object_config(
        "SELECT Id, Name FROM Account WHERE Legacy__c = true",
        Operation::Upsert,
    );
    cfg.delete_old_data = true;
    let (plan, tasks) = build(vec![cfg], vec![describe("Account", &["Name"], &[])]);

    let dq = tasks[0].delete_query(&plan);
    assert_eq!(dq.fields, vec!["Id"]);
    assert_eq!(dq.where_clause.as_deref(), Some("Legacy__c = true"));
}

#[test]
fn explicit_delete_query_overrides_the_selection() {
    let mut cfg = object_config("SELECT Id, Name FROM Account", Operation::Delete);
    cfg.delete_query = Some("SELECT Id FROM Account WHERE Stale__c = true".to_string());
    let (plan, tasks) = build(vec![cfg], vec![describe("Account", &["Name"], &[])]);

    let dq = tasks[0].delete_query(&plan);
    assert_eq!(dq.where_clause.as_deref(), Some("Stale__c = true"));
}
