use std::collections::BTreeMap;
use workbench_fields::validate::{
    validate_authority_link_value, validate_latlong_value, validate_link_value,
    validate_media_track_value, validate_typed_relation_value,
};
use workbench_fields::RowValidator;
use workbench_types::{FieldDefinition, Row};

// ── single values ────────────────────────────────────────────────

#[test]
fn latlong_values() {
    assert!(validate_latlong_value("49.16667,-123.93333"));
    assert!(validate_latlong_value("+49.16667, -123.93333"));
    assert!(validate_latlong_value(r"\+49.16667,\-123.93333"));
    assert!(validate_latlong_value("90,180"));
    assert!(!validate_latlong_value("90.1,10"));
    assert!(!validate_latlong_value("45,181"));
    assert!(!validate_latlong_value("45"));
    assert!(!validate_latlong_value("north,west"));
}

#[test]
fn link_values() {
    assert!(validate_link_value("http://example.com"));
    assert!(validate_link_value("https://example.com/a?b=c"));
    assert!(!validate_link_value("example.com"));
    assert!(!validate_link_value("ftp://example.com"));
}

#[test]
fn authority_link_values() {
    let sources = vec!["viaf".to_string(), "lcsh".to_string()];
    assert!(validate_authority_link_value("viaf%%http://viaf.org/1", &sources));
    assert!(validate_authority_link_value("lcsh%%http://id.loc.gov/2%%Title", &sources));
    assert!(!validate_authority_link_value("other%%http://x.org", &sources));
    assert!(!validate_authority_link_value("viaf%%viaf.org/1", &sources));
    assert!(!validate_authority_link_value("http://viaf.org/1", &sources));
    assert!(validate_authority_link_value("any%%http://x.org", &[]));
}

#[test]
fn typed_relation_values() {
    assert!(validate_typed_relation_value("relators:aut:5"));
    assert!(validate_typed_relation_value("relators:aut:http://example.com/x"));
    assert!(!validate_typed_relation_value("relators:5"));
    assert!(!validate_typed_relation_value("aut"));
}

#[test]
fn media_track_values() {
    assert!(validate_media_track_value("English:subtitles:en:/tmp/en.vtt"));
    assert!(validate_media_track_value(r"English:captions:en:D:\tracks\en.vtt"));
    assert!(!validate_media_track_value("English:karaoke:en:/tmp/en.vtt"));
    assert!(!validate_media_track_value("English:subtitles:/tmp/en.vtt"));
}

// ── row validation ───────────────────────────────────────────────

fn definitions() -> BTreeMap<String, FieldDefinition> {
    let mut defs = BTreeMap::new();
    defs.insert("title".to_string(), FieldDefinition::title(20));
    defs.insert("field_coordinates".to_string(), FieldDefinition::new("geolocation", 2));
    defs.insert("field_url".to_string(), FieldDefinition::new("link", -1));
    defs
}

#[test]
fn clean_rows_have_no_issues() {
    let defs = definitions();
    let rows = vec![
        Row::new("1")
            .with_column("id", "1")
            .with_column("title", "Hello")
            .with_column("field_coordinates", "49.1,-123.9")
            .with_column("field_url", "https://a.org%%A"),
    ];
    let issues = RowValidator::new(&defs, "|")
        .with_reserved(["id"])
        .require_required_fields()
        .validate(&rows);
    assert!(issues.is_empty(), "{issues:?}");
}

#[test]
fn reports_each_problem_with_row_and_field() {
    let defs = definitions();
    let rows = vec![
        Row::new("7")
            .with_column("id", "7")
            .with_column("title", "A title that is far too long")
            .with_column("field_coordinates", "1,1|2,2|200,2")
            .with_column("field_url", "not a url")
            .with_column("field_unknown", "x"),
    ];
    let issues = RowValidator::new(&defs, "|").with_reserved(["id"]).validate(&rows);

    let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
    assert_eq!(
        fields,
        vec!["title", "field_coordinates", "field_coordinates", "field_url", "field_unknown"]
    );
    assert!(issues.iter().all(|i| i.row_id == "7"));
    assert!(issues[2].message.contains("(2)"));
    assert!(issues[0].to_string().starts_with("record 7, field title:"));
}

#[test]
fn missing_required_fields_reported_for_create() {
    let defs = definitions();
    let rows = vec![Row::new("3").with_column("id", "3").with_column("title", "")];
    let issues = RowValidator::new(&defs, "|")
        .with_reserved(["id"])
        .require_required_fields()
        .validate(&rows);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].field, "title");
}
