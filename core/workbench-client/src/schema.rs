//! Field definitions for the configured content type.

use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpTransport, Method};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use workbench_types::{FieldDefinition, TargetType, WorkbenchConfig};

/// Fetches the definition of every `field_*` field of `entity_kind`
/// (`node`, `media`, ...) in the configured bundle. Nodes also get `title`.
///
/// Three endpoints are read per bundle: the form display lists the fields,
/// `field_config` carries type, label and handler settings, and
/// `field_storage_config` carries cardinality, target type and length.
pub fn get_field_definitions(
    transport: &dyn HttpTransport,
    config: &WorkbenchConfig,
    entity_kind: &str,
) -> ClientResult<BTreeMap<String, FieldDefinition>> {
    let bundle = &config.content_type;
    let display_path =
        format!("/entity/entity_form_display/{entity_kind}.{bundle}.default?_format=json");
    let display = get_json(transport, &display_path)?;

    let field_names: Vec<String> = display
        .get("content")
        .and_then(Value::as_object)
        .ok_or_else(|| ClientError::UnexpectedResponse {
            path: display_path.clone(),
            reason: "missing \"content\" object".to_string(),
        })?
        .keys()
        .filter(|name| name.starts_with("field_"))
        .cloned()
        .collect();

    let mut definitions = BTreeMap::new();
    for name in field_names {
        let field_config = get_json(
            transport,
            &format!("/entity/field_config/{entity_kind}.{bundle}.{name}?_format=json"),
        )?;
        let storage = get_json(
            transport,
            &format!("/entity/field_storage_config/{entity_kind}.{name}?_format=json"),
        )?;
        let definition = definition_from(&field_config, &storage);
        debug!(field = %name, kind = %definition.kind, cardinality = %definition.cardinality, "field definition");
        definitions.insert(name, definition);
    }

    if entity_kind == "node" {
        definitions.insert(
            "title".to_string(),
            FieldDefinition::title(config.max_node_title_length),
        );
    }
    Ok(definitions)
}

fn get_json(transport: &dyn HttpTransport, path: &str) -> ClientResult<Value> {
    transport
        .issue_request(Method::Get, path, None)?
        .expect_status(200, Method::Get, path)?
        .json()
}

fn definition_from(field_config: &Value, storage: &Value) -> FieldDefinition {
    let field_type = field_config
        .get("field_type")
        .and_then(Value::as_str)
        .unwrap_or("string");
    let cardinality = storage
        .get("cardinality")
        .and_then(Value::as_i64)
        .unwrap_or(-1);
    let mut definition = FieldDefinition::new(field_type, cardinality);

    definition.required = field_config
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    definition.label = field_config
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let settings = field_config.get("settings");
    definition.vocabularies = settings
        .and_then(|s| s.pointer("/handler_settings/target_bundles"))
        .and_then(Value::as_object)
        .map(|bundles| bundles.keys().cloned().collect())
        .unwrap_or_default();
    definition.authority_sources = settings
        .and_then(|s| s.get("authority_sources"))
        .and_then(Value::as_object)
        .map(|sources| sources.keys().cloned().collect())
        .unwrap_or_default();

    let storage_settings = storage.get("settings");
    definition.target_type = storage_settings
        .and_then(|s| s.get("target_type"))
        .and_then(Value::as_str)
        .map(TargetType::from_setting)
        .unwrap_or_default();
    definition.max_length = storage_settings
        .and_then(|s| s.get("max_length"))
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok());
    definition.allowed_values = storage_settings
        .and_then(|s| s.get("allowed_values"))
        .map(allowed_values)
        .unwrap_or_default();

    definition
}

/// `allowed_values` arrives either as a `{key: label}` map or as a list of
/// `{value, label}` objects depending on the server version.
fn allowed_values(raw: &Value) -> Vec<String> {
    match raw {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item.get("value") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
