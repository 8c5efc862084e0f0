use crate::support::{describe, object_config, test_config};
use orgbridge::config::Operation;
use orgbridge::model::{FieldDescriptor, ObjectDescribe};
use orgbridge::plan::{build_execution_order, Plan};
use std::collections::HashMap;

fn describes(list: Vec<ObjectDescribe>) -> HashMap<String, ObjectDescribe> {
    list.into_iter().map(|d| (d.name.clone(), d)).collect()
}

fn order_names(plan: &Plan) -> Vec<String> {
    build_execution_order(plan)
        .into_iter()
        .map(|i| plan.entries[i].name.clone())
        .collect()
}

fn master_detail(name: &str, object: &str, parent: &str) -> FieldDescriptor {
    let mut f = FieldDescriptor::reference(name, object, parent);
    f.updateable = false;
    f
}

#[test]
fn parents_precede_children_regardless_of_declaration_order() {
    // Contact declared first; its Account dependency pulls Account ahead
    let config = test_config(vec![
        object_config(
            "SELECT Id, LastName, AccountId FROM Contact",
            Operation::Upsert,
        ),
        object_config("SELECT Id, Name FROM Account", Operation::Upsert),
    ]);
    let source = describes(vec![
        describe("Contact", &["LastName", "Name"], &[("AccountId", "Account")]),
        describe("Account", &["Name"], &[]),
    ]);
    let plan = Plan::build(&config, &source, &source.clone()).unwrap();

    let names = order_names(&plan);
    let account = names.iter().position(|n| n == "Account").unwrap();
    let contact = names.iter().position(|n| n == "Contact").unwrap();
    assert!(account < contact);
}

#[test]
fn record_type_always_lands_at_index_zero() {
    let config = test_config(vec![
        object_config("SELECT Id, Name FROM Account", Operation::Upsert),
        object_config(
            "SELECT Id, DeveloperName, SobjectType FROM RecordType",
            Operation::Readonly,
        ),
    ]);
    let source = describes(vec![
        describe("Account", &["Name"], &[]),
        describe("RecordType", &["DeveloperName", "SobjectType", "Name"], &[]),
    ]);
    let plan = Plan::build(&config, &source, &source.clone()).unwrap();

    assert_eq!(order_names(&plan)[0], "RecordType");
}

#[test]
fn master_detail_parent_wins_over_mutual_reference_placement() {
    // A holds an ordinary lookup to B, B holds a master-detail to A. The
    // referenced-by scan puts B first (A depends on it); the correction
    // pass must relocate A back in front because B cannot exist without
    // its master.
    let a = describe("A__c", &["Name"], &[("B__c", "B__c")]);
    let mut b = ObjectDescribe::new("B__c");
    b.add_field(FieldDescriptor::new("Id", "B__c"));
    b.add_field(FieldDescriptor::new("Name", "B__c"));
    b.add_field(master_detail("A__c", "B__c", "A__c"));

    let config = test_config(vec![
        object_config("SELECT Id, Name, B__c FROM A__c", Operation::Upsert),
        object_config("SELECT Id, Name, A__c FROM B__c", Operation::Upsert),
    ]);
    let source = describes(vec![a, b]);
    let plan = Plan::build(&config, &source, &source.clone()).unwrap();

    let names = order_names(&plan);
    let a_pos = names.iter().position(|n| n == "A__c").unwrap();
    let b_pos = names.iter().position(|n| n == "B__c").unwrap();
    assert!(a_pos < b_pos, "master must precede its detail: {:?}", names);
}

#[test]
fn master_detail_chain_is_fully_ordered() {
    // Grandparent <- master-detail - Parent <- master-detail - Child,
    // declared in reverse
    let mut child = ObjectDescribe::new("Child__c");
    child.add_field(FieldDescriptor::new("Id", "Child__c"));
    child.add_field(FieldDescriptor::new("Name", "Child__c"));
    child.add_field(master_detail("Parent__c", "Child__c", "Parent__c"));
    let mut parent = ObjectDescribe::new("Parent__c");
    parent.add_field(FieldDescriptor::new("Id", "Parent__c"));
    parent.add_field(FieldDescriptor::new("Name", "Parent__c"));
    parent.add_field(master_detail("Grand__c", "Parent__c", "Grand__c"));
    let grand = describe("Grand__c", &["Name"], &[]);

    let config = test_config(vec![
        object_config("SELECT Id, Name, Parent__c FROM Child__c", Operation::Upsert),
        object_config("SELECT Id, Name, Grand__c FROM Parent__c", Operation::Upsert),
        object_config("SELECT Id, Name FROM Grand__c", Operation::Upsert),
    ]);
    let source = describes(vec![child, parent, grand]);
    let plan = Plan::build(&config, &source, &source.clone()).unwrap();

    let names = order_names(&plan);
    let g = names.iter().position(|n| n == "Grand__c").unwrap();
    let p = names.iter().position(|n| n == "Parent__c").unwrap();
    let c = names.iter().position(|n| n == "Child__c").unwrap();
    assert!(g < p && p < c, "chain out of order: {:?}", names);
}

#[test]
fn independent_objects_keep_declaration_order() {
    let config = test_config(vec![
        object_config("SELECT Id, Name FROM Alpha__c", Operation::Upsert),
        object_config("SELECT Id, Name FROM Beta__c", Operation::Upsert),
    ]);
    let source = describes(vec![
        describe("Alpha__c", &["Name"], &[]),
        describe("Beta__c", &["Name"], &[]),
    ]);
    let plan = Plan::build(&config, &source, &source.clone()).unwrap();

    assert_eq!(order_names(&plan), vec!["Alpha__c", "Beta__c"]);
}
