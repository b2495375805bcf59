//! Node payload assembly.

use crate::error::SyncResult;
use serde_json::{Map, Value, json};
use workbench_fields::{Reconciled, ReconcileContext, TermResolver, reconciler_for};
use workbench_types::{FieldDefinition, FieldState, RemoteId, Row, UpdateMode, WorkbenchConfig};

/// `type` and `status` of a new node.
pub fn node_base(config: &WorkbenchConfig) -> Map<String, Value> {
    let mut body = node_base_for_update(config);
    body.insert("status".to_string(), json!([{ "value": config.published }]));
    body
}

/// `type` only; an update leaves the publication status alone.
pub fn node_base_for_update(config: &WorkbenchConfig) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert(
        "type".to_string(),
        json!([{ "target_id": config.content_type, "target_type": "node_type" }]),
    );
    body
}

fn context<'c>(
    config: &'c WorkbenchConfig,
    name: &'c str,
    def: &'c FieldDefinition,
    row: &'c Row,
    terms: &'c dyn TermResolver,
) -> ReconcileContext<'c> {
    ReconcileContext::new(name, def, row, &config.subdelimiter, terms)
        .with_text_format(config.text_format_for(name))
}

pub fn reconcile_create(
    config: &WorkbenchConfig,
    name: &str,
    def: &FieldDefinition,
    row: &Row,
    terms: &dyn TermResolver,
) -> Reconciled {
    reconciler_for(def.kind).create(&context(config, name, def, row, terms))
}

/// New state of one field of an existing node, or `None` when the field
/// should be left out of the PATCH body.
///
/// Blank cells are left out unless the update mode is `delete`. The title is
/// never deleted.
pub fn reconcile_update(
    config: &WorkbenchConfig,
    name: &str,
    def: &FieldDefinition,
    row: &Row,
    existing_node: &Value,
    terms: &dyn TermResolver,
) -> SyncResult<Option<Reconciled>> {
    let mode = config.update_mode;
    if name == "title" && mode == UpdateMode::Delete {
        return Ok(None);
    }
    if mode != UpdateMode::Delete && row.get_non_blank(name).is_none() {
        return Ok(None);
    }
    let existing = FieldState::from_json(def, existing_node.get(name).unwrap_or(&Value::Null))?;
    let ctx = context(config, name, def, row, terms);
    Ok(Some(reconciler_for(def.kind).update(&ctx, &existing, mode)))
}

/// Adds the parent reference to `parent_field`, ahead of any values the row
/// supplied for that field.
pub fn link_parent(body: &mut Map<String, Value>, parent_field: &str, parent: &RemoteId) {
    let target_id = parent
        .as_number()
        .map_or_else(|| Value::from(parent.as_str()), Value::from);
    let reference = json!({ "target_id": target_id, "target_type": "node_type" });

    let values = body
        .entry(parent_field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match values {
        Value::Array(items) => {
            if !items.iter().any(|v| v.get("target_id") == Some(&target_id)) {
                items.insert(0, reference);
            }
        }
        other => *other = Value::Array(vec![reference]),
    }
}
