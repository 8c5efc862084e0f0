use orgbridge::model::{FieldValue, Row};

#[test]
fn empty_strings_and_nulls_both_count_as_empty() {
    assert!(FieldValue::Null.is_empty());
    assert!(FieldValue::Str(String::new()).is_empty());
    assert!(!FieldValue::Str("x".to_string()).is_empty());
    assert!(!FieldValue::Num(0.0).is_empty());
    assert!(!FieldValue::Bool(false).is_empty());
}

#[test]
fn truthiness_covers_the_wire_shapes() {
    assert!(FieldValue::Bool(true).is_truthy());
    assert!(FieldValue::Str("TRUE".to_string()).is_truthy());
    assert!(FieldValue::Num(1.0).is_truthy());
    assert!(!FieldValue::Str("false".to_string()).is_truthy());
    assert!(!FieldValue::Null.is_truthy());
}

#[test]
fn whole_numbers_render_without_a_fraction() {
    assert_eq!(FieldValue::Num(42.0).render(), "42");
    assert_eq!(FieldValue::Num(1.5).render(), "1.5");
    assert_eq!(FieldValue::Bool(true).render(), "true");
    assert_eq!(FieldValue::Null.render(), "");
}

#[test]
fn canonical_string_is_insensitive_to_column_order_and_absence() {
    let fields: Vec<String> = vec!["Id".into(), "Name".into(), "Industry".into()];

    let mut a = Row::new();
    a.set("Name", "Acme");
    a.set("Id", "A1");

    let mut b = Row::new();
    b.set("Id", "A1");
    b.set("Name", "Acme");
    // Explicit null and absent column canonicalize identically
    b.set("Industry", FieldValue::Null);

    assert_eq!(a.canonical_string(&fields), b.canonical_string(&fields));

    let mut c = Row::new();
    c.set("Id", "A1");
    c.set("Name", "Other");
    assert_ne!(a.canonical_string(&fields), c.canonical_string(&fields));
}

#[test]
fn error_slot_round_trips_and_clears() {
    let mut row = Row::new();
    assert!(row.error().is_none());
    row.set_error(Some("boom".to_string()));
    assert_eq!(row.error(), Some("boom"));
    row.set_error(None);
    assert!(row.error().is_none());
}

#[test]
fn json_round_trip_keeps_value_tags() {
    let mut row = Row::new();
    row.set("Id", "A1");
    row.set("Active", FieldValue::Bool(true));
    row.set("Score", FieldValue::Num(3.0));
    row.set("Notes", FieldValue::Null);

    let back = Row::from_json(&row.to_json());
    assert_eq!(back.get("Id"), Some(&FieldValue::Str("A1".to_string())));
    assert_eq!(back.get("Active"), Some(&FieldValue::Bool(true)));
    assert_eq!(back.get("Score"), Some(&FieldValue::Num(3.0)));
    assert!(back.get("Notes").unwrap().is_null());
}
