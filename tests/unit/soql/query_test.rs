use orgbridge::soql::SoqlQuery;

#[test]
fn parses_projection_and_object() {
    let q = SoqlQuery::parse("SELECT Id, Name, Industry FROM Account").unwrap();
    assert_eq!(q.object, "Account");
    assert_eq!(q.fields, vec!["Id", "Name", "Industry"]);
    assert!(q.where_clause.is_none());
    assert!(q.limit.is_none());
}

#[test]
fn parses_filter_and_limit() {
    let q = SoqlQuery::parse(
        "SELECT Id, Name FROM Account WHERE Industry = 'Tech' AND Active__c = true LIMIT 50",
    )
    .unwrap();
    assert_eq!(q.object, "Account");
    assert_eq!(
        q.where_clause.as_deref(),
        Some("Industry = 'Tech' AND Active__c = true")
    );
    assert_eq!(q.limit, Some(50));
}

#[test]
fn parse_is_case_insensitive_on_keywords() {
    let q = SoqlQuery::parse("select Id from Contact where Email != null").unwrap();
    assert_eq!(q.object, "Contact");
    assert_eq!(q.where_clause.as_deref(), Some("Email != null"));
}

#[test]
fn rejects_malformed_statements() {
    assert!(SoqlQuery::parse("UPDATE Account SET Name = 'x'").is_err());
    assert!(SoqlQuery::parse("SELECT Id Account").is_err());
    assert!(SoqlQuery::parse("SELECT FROM Account").is_err());
    assert!(SoqlQuery::parse("select from Account").is_err());
    assert!(SoqlQuery::parse("SELECT  FROM Account").is_err());
    assert!(SoqlQuery::parse("SELECT Id FROM Account LIMIT abc").is_err());
    assert!(SoqlQuery::parse("SELECT Id FROM ").is_err());
}

#[test]
fn with_fields_replaces_projection_and_keeps_filter() {
    let q = SoqlQuery::parse("SELECT Id FROM Account WHERE Name = 'Acme' LIMIT 10").unwrap();
    let full = q.with_fields(vec!["Id".into(), "Name".into(), "Account.Name".into()]);
    assert_eq!(full.fields.len(), 3);
    assert_eq!(full.where_clause.as_deref(), Some("Name = 'Acme'"));
    assert_eq!(full.limit, Some(10));
}

#[test]
fn count_query_projects_single_aggregate() {
    let q = SoqlQuery::parse("SELECT Id, Name FROM Account WHERE Name != null").unwrap();
    let count = q.count_query();
    assert_eq!(count.fields, vec!["COUNT(Id) expr0"]);
    assert_eq!(count.where_clause, q.where_clause);
    assert!(count.limit.is_none());
}

#[test]
fn compose_round_trips() {
    let text = "SELECT Id, Name FROM Account WHERE Industry = 'Tech' LIMIT 5";
    let q = SoqlQuery::parse(text).unwrap();
    assert_eq!(q.compose(), text);
    assert!(q.has_filter());
    assert!(!SoqlQuery::parse("SELECT Id FROM Account").unwrap().has_filter());
}
