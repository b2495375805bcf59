use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use workbench_fields::{
    reconciler_for, FieldWarning, NoTermLookup, ReconcileContext, Reconciled, TermResolver,
};
use workbench_types::{
    FieldDefinition, FieldState, Row, SubValue, TargetId, TargetType, UpdateMode,
};

/// Resolves names from a fixed table and records every lookup.
#[derive(Default)]
struct TableTerms {
    terms: HashMap<String, u64>,
    lookups: RefCell<Vec<String>>,
}

impl TableTerms {
    fn with(mut self, name: &str, id: u64) -> Self {
        self.terms.insert(name.to_string(), id);
        self
    }
}

impl TermResolver for TableTerms {
    fn resolve_or_create_term(&self, _vocabularies: &[String], raw: &str) -> Option<u64> {
        self.lookups.borrow_mut().push(raw.to_string());
        self.terms.get(raw).copied()
    }
}

fn create(def: &FieldDefinition, field: &str, raw: &str) -> Reconciled {
    create_with(def, field, raw, &NoTermLookup)
}

fn create_with(def: &FieldDefinition, field: &str, raw: &str, terms: &dyn TermResolver) -> Reconciled {
    let row = Row::new("row-1").with_column(field, raw);
    let ctx = ReconcileContext::new(field, def, &row, "|", terms);
    reconciler_for(def.kind).create(&ctx)
}

fn update(
    def: &FieldDefinition,
    field: &str,
    existing: &FieldState,
    raw: &str,
    mode: UpdateMode,
) -> Reconciled {
    let row = Row::new("row-1").with_column(field, raw);
    let ctx = ReconcileContext::new(field, def, &row, "|", &NoTermLookup);
    reconciler_for(def.kind).update(&ctx, existing, mode)
}

fn cardinality_warning(limit: usize, actual: usize, field: &str) -> FieldWarning {
    FieldWarning::CardinalityViolation {
        field: field.to_string(),
        row_id: "row-1".to_string(),
        limit,
        actual,
    }
}

// ── scenarios ────────────────────────────────────────────────────

#[test]
fn singular_simple_field_keeps_first_value() {
    let def = FieldDefinition::new("string", 1);
    let out = create(&def, "field_foo", "Field foo value|Extraneous value");

    assert_eq!(out.state.to_json(), json!([{"value": "Field foo value"}]));
    assert_eq!(out.warnings, vec![cardinality_warning(1, 2, "field_foo")]);
    let message = out.warnings[0].to_string();
    assert!(message.contains("field_foo"));
    assert!(message.contains("row-1"));
    assert!(message.contains("(1)"));
}

#[test]
fn bounded_geolocation_drops_extra_points() {
    let def = FieldDefinition::new("geolocation", 2);
    let out = create(
        &def,
        "field_coordinates",
        "51.16667,-123.93333|61.16667,-123.93333|63.16667,-123.93333",
    );

    assert_eq!(
        out.state.as_slice(),
        &[
            SubValue::geo("51.16667", "-123.93333"),
            SubValue::geo("61.16667", "-123.93333"),
        ]
    );
    assert_eq!(out.warnings, vec![cardinality_warning(2, 3, "field_coordinates")]);
}

#[test]
fn unbounded_term_reference_appends() {
    let def = FieldDefinition::new("entity_reference", -1).with_target_type(TargetType::TaxonomyTerm);
    let existing = FieldState::new(vec![SubValue::reference(70, TargetType::TaxonomyTerm)]);
    let out = update(&def, "field_subject", &existing, "72|73", UpdateMode::Append);

    assert_eq!(
        out.state.to_json(),
        json!([
            {"target_id": 70, "target_type": "taxonomy_term"},
            {"target_id": 72, "target_type": "taxonomy_term"},
            {"target_id": 73, "target_type": "taxonomy_term"},
        ])
    );
    assert!(out.warnings.is_empty());
}

#[test]
fn singular_link_keeps_first_link() {
    let def = FieldDefinition::new("link", 1);
    let out = create(&def, "field_url", "http://bar.com%%Bar website|http://biz.com%%Biz website");

    assert_eq!(
        out.state.as_slice(),
        &[SubValue::link("http://bar.com", "Bar website")]
    );
    assert_eq!(out.warnings, vec![cardinality_warning(1, 2, "field_url")]);
}

// ── merge rules ──────────────────────────────────────────────────

#[test]
fn singular_field_replaced_under_append() {
    let def = FieldDefinition::new("string", 1);
    let existing = FieldState::new(vec![SubValue::scalar("old")]);
    let out = update(&def, "field_foo", &existing, "new|newer", UpdateMode::Append);
    assert_eq!(out.state.as_slice(), &[SubValue::scalar("new")]);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn replace_discards_existing_values() {
    let def = FieldDefinition::new("string", -1);
    let existing = FieldState::new(vec![SubValue::scalar("old")]);
    let out = update(&def, "field_foo", &existing, "a|b", UpdateMode::Replace);
    assert_eq!(out.state.as_slice(), &[SubValue::scalar("a"), SubValue::scalar("b")]);
}

#[test]
fn append_truncates_to_bound_with_warning() {
    let def = FieldDefinition::new("string", 3);
    let existing = FieldState::new(vec![SubValue::scalar("a"), SubValue::scalar("b")]);
    let out = update(&def, "field_foo", &existing, "c|d", UpdateMode::Append);
    assert_eq!(
        out.state.as_slice(),
        &[SubValue::scalar("a"), SubValue::scalar("b"), SubValue::scalar("c")]
    );
    assert_eq!(out.warnings, vec![cardinality_warning(3, 4, "field_foo")]);
}

#[test]
fn append_dedupes_against_existing() {
    let def = FieldDefinition::new("string", -1);
    let existing = FieldState::new(vec![SubValue::scalar("a")]);
    let out = update(&def, "field_foo", &existing, "a|b|b", UpdateMode::Append);
    assert_eq!(out.state.as_slice(), &[SubValue::scalar("a"), SubValue::scalar("b")]);
}

#[test]
fn delete_empties_regardless_of_input() {
    let def = FieldDefinition::new("link", 1);
    let existing = FieldState::new(vec![SubValue::link("http://a.com", "A")]);
    let out = update(&def, "field_url", &existing, "http://b.com", UpdateMode::Delete);
    assert!(out.state.is_empty());
    assert!(out.warnings.is_empty());
}

#[test]
fn blank_cell_on_update_keeps_existing() {
    let def = FieldDefinition::new("string", -1);
    let existing = FieldState::new(vec![SubValue::scalar("keep")]);
    let out = update(&def, "field_foo", &existing, "  ", UpdateMode::Replace);
    assert_eq!(out.state, existing);
}

#[test]
fn blank_cell_on_create_is_empty() {
    let def = FieldDefinition::new("string", -1);
    assert!(create(&def, "field_foo", "").state.is_empty());
}

// ── simple field typing ──────────────────────────────────────────

#[test]
fn integer_fields_emit_numbers_and_drop_garbage() {
    let def = FieldDefinition::new("integer", -1);
    let out = create(&def, "field_count", "3|three|-7");
    assert_eq!(out.state.to_json(), json!([{"value": 3}, {"value": -7}]));
    assert!(matches!(
        &out.warnings[..],
        [FieldWarning::InvalidValue { value, .. }] if value == "three"
    ));
}

#[test]
fn list_fields_reject_unknown_keys() {
    let def = FieldDefinition::new("list_string", -1).with_allowed_values(["red", "blue"]);
    let out = create(&def, "field_colour", "red|green");
    assert_eq!(out.state.as_slice(), &[SubValue::scalar("red")]);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn long_values_are_truncated() {
    let def = FieldDefinition::new("string", 1).with_max_length(5);
    let out = create(&def, "field_short", "abcdefgh");
    assert_eq!(out.state.as_slice(), &[SubValue::scalar("abcde")]);
    assert!(matches!(
        &out.warnings[..],
        [FieldWarning::ValueTruncated { max_length: 5, .. }]
    ));
}

#[test]
fn formatted_text_carries_format() {
    let def = FieldDefinition::new("text_long", -1);
    let row = Row::new("1").with_column("field_description", "<p>Hi</p>");
    let ctx = ReconcileContext::new("field_description", &def, &row, "|", &NoTermLookup)
        .with_text_format("full_html");
    let out = reconciler_for(def.kind).create(&ctx);
    assert_eq!(
        out.state.to_json(),
        json!([{"value": "<p>Hi</p>", "format": "full_html"}])
    );
}

#[test]
fn title_is_singular_and_truncated() {
    let def = FieldDefinition::title(10);
    let out = create(&def, "title", "A very long title|Another");
    assert_eq!(out.state.as_slice(), &[SubValue::scalar("A very lon")]);
    assert_eq!(out.warnings.len(), 2);
}

// ── term resolution ──────────────────────────────────────────────

#[test]
fn numeric_term_ids_skip_the_resolver() {
    let terms = TableTerms::default();
    let def = FieldDefinition::new("entity_reference", -1).with_target_type(TargetType::TaxonomyTerm);
    let out = create_with(&def, "field_subject", "12", &terms);
    assert_eq!(out.state.as_slice(), &[SubValue::reference(12, TargetType::TaxonomyTerm)]);
    assert!(terms.lookups.borrow().is_empty());
}

#[test]
fn unresolved_terms_are_dropped_with_warning() {
    let terms = TableTerms::default().with("Cats", 40);
    let def = FieldDefinition::new("entity_reference", -1)
        .with_target_type(TargetType::TaxonomyTerm)
        .with_vocabularies(["tags"]);
    let out = create_with(&def, "field_subject", "Cats|Dogs", &terms);

    assert_eq!(out.state.as_slice(), &[SubValue::reference(40, TargetType::TaxonomyTerm)]);
    assert_eq!(
        out.warnings,
        vec![FieldWarning::TermResolution {
            field: "field_subject".into(),
            row_id: "row-1".into(),
            value: "Dogs".into(),
        }]
    );
}

#[test]
fn node_references_require_numeric_ids() {
    let def = FieldDefinition::new("entity_reference", -1).with_target_type(TargetType::Node);
    let out = create(&def, "field_member_of", "5|parent");
    assert_eq!(out.state.to_json(), json!([{"target_id": 5, "target_type": "node_type"}]));
    assert_eq!(out.warnings.len(), 1);
}

// ── typed relations ──────────────────────────────────────────────

#[test]
fn typed_relation_create_and_append() {
    let terms = TableTerms::default().with("Jordan, Mark", 8);
    let def = FieldDefinition::new("typed_relation", 2).with_target_type(TargetType::TaxonomyTerm);
    let out = create_with(&def, "field_linked_agent", "relators:aut:Jordan, Mark|relators:pht:3", &terms);
    assert_eq!(
        out.state.to_json(),
        json!([
            {"target_id": 8, "rel_type": "relators:aut", "target_type": "taxonomy_term"},
            {"target_id": 3, "rel_type": "relators:pht", "target_type": "taxonomy_term"},
        ])
    );

    let appended = update(&def, "field_linked_agent", &out.state, "relators:ill:9", UpdateMode::Append);
    assert_eq!(appended.state.len(), 2);
    assert_eq!(appended.warnings, vec![cardinality_warning(2, 3, "field_linked_agent")]);
}

#[test]
fn typed_relation_singular_replace() {
    let def = FieldDefinition::new("typed_relation", 1).with_target_type(TargetType::Node);
    let existing = FieldState::new(vec![SubValue::typed_relation(1, "relators:aut", TargetType::Node)]);
    let out = update(&def, "field_rel", &existing, "relators:pht:2|relators:pht:3", UpdateMode::Append);
    assert_eq!(
        out.state.as_slice(),
        &[SubValue::TypedRelation {
            target_id: TargetId::Id(2),
            rel_type: "relators:pht".into(),
            target_type: "node_type".into(),
        }]
    );
}

// ── value validation inside reconcilers ──────────────────────────

#[test]
fn invalid_points_and_links_are_dropped() {
    let geo = FieldDefinition::new("geolocation", -1);
    let out = create(&geo, "field_coordinates", "91.0,10.0|45.0,10.0");
    assert_eq!(out.state.as_slice(), &[SubValue::geo("45.0", "10.0")]);
    assert_eq!(out.warnings.len(), 1);

    let link = FieldDefinition::new("link", -1);
    let out = create(&link, "field_url", "ftp://x.org|https://y.org");
    assert_eq!(out.state.as_slice(), &[SubValue::link("https://y.org", "https://y.org")]);
}

#[test]
fn authority_links_check_source() {
    let def = FieldDefinition::new("authority_link", -1).with_authority_sources(["viaf"]);
    let out = create(&def, "field_authority", "viaf%%http://viaf.org/1|lcsh%%http://id.loc.gov/2");
    assert_eq!(out.state.len(), 1);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn media_tracks_check_kind() {
    let def = FieldDefinition::new("media_track", -1);
    let out = create(&def, "field_track", "English:subtitles:en:/a.vtt|Bad:karaoke:en:/b.vtt");
    assert_eq!(out.state.len(), 1);
    assert_eq!(out.warnings.len(), 1);
}

// ── serialization ────────────────────────────────────────────────

#[test]
fn link_serialization_resplits_to_same_values() {
    let def = FieldDefinition::new("link", -1);
    let raw = "http://bar.com%%Bar website|http://biz.com|http://baz.com%%";
    let first = create(&def, "field_url", raw).state;
    let rendered = reconciler_for(def.kind).serialize(&first, "|");
    let second = create(&def, "field_url", &rendered).state;
    assert_eq!(first, second);
}

#[test]
fn serialize_each_shape() {
    let typed = FieldState::new(vec![SubValue::typed_relation(5, "relators:pht", TargetType::TaxonomyTerm)]);
    assert_eq!(
        reconciler_for(workbench_types::FieldKind::TypedRelation).serialize(&typed, "|"),
        "relators:pht:5"
    );

    let geo = FieldState::new(vec![SubValue::geo("1", "2"), SubValue::geo("3", "4")]);
    assert_eq!(
        reconciler_for(workbench_types::FieldKind::Geolocation).serialize(&geo, "|"),
        "1,2|3,4"
    );

    let numbers = FieldState::new(vec![SubValue::scalar(3), SubValue::scalar("x")]);
    assert_eq!(
        reconciler_for(workbench_types::FieldKind::Simple).serialize(&numbers, ";"),
        "3;x"
    );
}

// ── dispatch ─────────────────────────────────────────────────────

#[test]
fn every_kind_dispatches_to_its_own_reconciler() {
    use workbench_types::FieldKind;
    for kind in [
        FieldKind::Simple,
        FieldKind::Geolocation,
        FieldKind::Link,
        FieldKind::EntityReference,
        FieldKind::TypedRelation,
        FieldKind::AuthorityLink,
        FieldKind::MediaTrack,
    ] {
        assert_eq!(reconciler_for(kind).kind(), kind);
    }
}
