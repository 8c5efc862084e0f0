use crate::support::{object_config, test_config};
use orgbridge::config::{ConfigValidator, MockFieldConfig, Operation};

#[test]
fn minimal_valid_configuration_passes() {
    let config = test_config(vec![object_config(
        "SELECT Id, Name FROM Account",
        Operation::Upsert,
    )]);
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
fn empty_object_list_is_rejected() {
    let config = test_config(vec![]);
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("At least one object"));
}

#[test]
fn identical_endpoints_are_rejected() {
    let mut config = test_config(vec![object_config(
        "SELECT Id, Name FROM Account",
        Operation::Upsert,
    )]);
    config.target = config.source.clone();
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("identical"));
}

#[test]
fn duplicate_object_declarations_are_rejected() {
    let config = test_config(vec![
        object_config("SELECT Id, Name FROM Account", Operation::Upsert),
        object_config("SELECT Id FROM Account", Operation::Insert),
    ]);
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn unfiltered_delete_needs_a_delete_query() {
    let config = test_config(vec![object_config(
        "SELECT Id FROM Account",
        Operation::Delete,
    )]);
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("delete"));

    let mut with_filter = object_config(
        "SELECT Id FROM Account WHERE Stale__c = true",
        Operation::Delete,
    );
    with_filter.delete_old_data = true;
    let config = test_config(vec![with_filter]);
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
fn malformed_queries_are_collected_with_their_index() {
    let config = test_config(vec![
        object_config("SELECT Id, Name FROM Account", Operation::Upsert),
        object_config("DELETE FROM Account", Operation::Upsert),
    ]);
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("Object 1"));
}

#[test]
fn unknown_mock_patterns_are_rejected() {
    let mut cfg = object_config("SELECT Id, Name FROM Account", Operation::Insert);
    cfg.mock_fields.push(MockFieldConfig {
        field: "Name".to_string(),
        pattern: "lorem_ipsum".to_string(),
    });
    let config = test_config(vec![cfg]);
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("lorem_ipsum"));
}

#[test]
fn zero_thresholds_are_rejected() {
    let mut config = test_config(vec![object_config(
        "SELECT Id, Name FROM Account",
        Operation::Upsert,
    )]);
    config.settings.bulk_threshold = 0;
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("bulk_threshold"));
}
