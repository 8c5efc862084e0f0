use orgbridge::config::{
    BulkApiVersion, Config, ConfigLoader, EndpointConfig, Operation, OrgEndpointConfig,
};
use orgbridge::error::OrgBridgeError;
use tempfile::TempDir;

#[test]
fn sample_configuration_deserializes() {
    let config: Config = serde_yaml::from_str(ConfigLoader::generate_sample()).unwrap();
    assert_eq!(config.objects.len(), 3);
    assert_eq!(config.objects[0].operation, Operation::Upsert);
    assert_eq!(config.objects[0].external_id.as_deref(), Some("Name"));
    assert_eq!(config.objects[2].operation, Operation::Readonly);
    assert!(matches!(config.source, EndpointConfig::Org(_)));
}

#[test]
fn explicit_files_load_normalized_and_validated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        r#"
source:
  type: org
  base_url: https://a.example.com
  username: csvfile
target:
  type: org
  base_url: https://b.example.com
objects:
  - query: SELECT Id, Name FROM Account
    operation: upsert
settings:
  data_dir: ./fixtures
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(path.to_str().unwrap()).unwrap();
    // The sentinel username collapsed during normalization
    match &config.source {
        EndpointConfig::Directory(d) => assert_eq!(d.path, "./fixtures"),
        other => panic!("expected directory endpoint, got {:?}", other),
    }
}

#[test]
fn malformed_documents_surface_as_yaml_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "source: [unbalanced").unwrap();

    let err = ConfigLoader::load_from_file(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, OrgBridgeError::Yaml(_)));
}

#[test]
fn settings_defaults_apply_when_omitted() {
    let yaml = r#"
source:
  type: org
  base_url: https://a.example.com
target:
  type: org
  base_url: https://b.example.com
objects:
  - query: SELECT Id, Name FROM Account
    operation: upsert
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.settings.bulk_threshold, 200);
    assert_eq!(config.settings.bulk_api_version, BulkApiVersion::V2);
    assert_eq!(config.settings.rest_batch_size, 200);
    assert_eq!(config.settings.bulk_batch_size, 9500);
    assert_eq!(config.settings.default_external_id, "Name");
    assert_eq!(config.settings.data_dir, "./data");
    assert!(!config.settings.prompt_on_missing_parent);
}

#[test]
fn file_sentinel_username_degrades_the_side_to_a_directory() {
    let yaml = r#"
source:
  type: org
  base_url: https://a.example.com
  username: csvfile
target:
  type: org
  base_url: https://b.example.com
objects:
  - query: SELECT Id, Name FROM Account
    operation: upsert
settings:
  data_dir: ./fixtures
"#;
    let mut config: Config = serde_yaml::from_str(yaml).unwrap();
    config.normalize();
    match &config.source {
        EndpointConfig::Directory(dir) => assert_eq!(dir.path, "./fixtures"),
        other => panic!("expected directory endpoint, got {:?}", other),
    }
    assert!(matches!(config.target, EndpointConfig::Org(_)));
}

#[test]
fn ordinary_usernames_do_not_degrade() {
    let endpoint = EndpointConfig::Org(OrgEndpointConfig {
        base_url: "https://a.example.com".to_string(),
        access_token: String::new(),
        username: Some("ops@example.com".to_string()),
        api_version: "60.0".to_string(),
    });
    assert!(matches!(
        endpoint.degraded("./data"),
        EndpointConfig::Org(_)
    ));
}

#[test]
fn object_level_flags_deserialize() {
    let yaml = r#"
source:
  type: directory
  path: ./in
target:
  type: directory
  path: ./out
objects:
  - query: SELECT Id, Name FROM Account
    operation: insert
    delete_old_data: true
    all_records: true
    use_value_mapping: true
    mock_fields:
      - field: Name
        pattern: name
    field_values:
      Industry:
        Tech: Technology
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let object = &config.objects[0];
    assert!(object.delete_old_data);
    assert!(object.all_records);
    assert!(object.use_value_mapping);
    assert_eq!(object.mock_fields[0].pattern, "name");
    assert_eq!(object.field_values["Industry"]["Tech"], "Technology");
}
