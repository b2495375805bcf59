//! Structured subvalues and per-field state.

use crate::error::{TypesError, TypesResult};
use crate::field::{FieldDefinition, FieldKind, TargetType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Target of a typed relation or entity reference: a numeric id, or a name
/// or URI that has not been resolved to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetId {
    Id(u64),
    Name(String),
}

impl TargetId {
    /// Numeric strings become `Id`, anything else stays a `Name`.
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Name(raw.to_string()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Id(id) => json!(id),
            Self::Name(name) => json!(name),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for TargetId {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

/// One value of a multi-valued field.
#[derive(Debug, Clone, PartialEq)]
pub enum SubValue {
    Scalar {
        value: Value,
        format: Option<String>,
    },
    GeoPoint {
        lat: String,
        lng: String,
    },
    Link {
        uri: String,
        title: String,
    },
    Reference {
        target_id: TargetId,
        target_type: String,
    },
    TypedRelation {
        target_id: TargetId,
        rel_type: String,
        target_type: String,
    },
    AuthorityLink {
        source: String,
        uri: String,
        title: String,
    },
    MediaTrack {
        label: String,
        kind: String,
        srclang: String,
        file_path: String,
    },
}

impl SubValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar {
            value: value.into(),
            format: None,
        }
    }

    pub fn text(value: impl Into<String>, format: impl Into<String>) -> Self {
        Self::Scalar {
            value: Value::String(value.into()),
            format: Some(format.into()),
        }
    }

    pub fn geo(lat: impl Into<String>, lng: impl Into<String>) -> Self {
        Self::GeoPoint {
            lat: lat.into(),
            lng: lng.into(),
        }
    }

    pub fn link(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self::Link {
            uri: uri.into(),
            title: title.into(),
        }
    }

    /// Reference to a numeric entity id.
    pub fn reference(target_id: u64, target_type: TargetType) -> Self {
        Self::Reference {
            target_id: TargetId::Id(target_id),
            target_type: target_type.payload_name().to_string(),
        }
    }

    pub fn typed_relation(target_id: u64, rel_type: impl Into<String>, target_type: TargetType) -> Self {
        Self::TypedRelation {
            target_id: TargetId::Id(target_id),
            rel_type: rel_type.into(),
            target_type: target_type.payload_name().to_string(),
        }
    }

    /// JSON object in the shape the remote API accepts for this value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar { value, format } => {
                let mut obj = Map::new();
                obj.insert("value".into(), value.clone());
                if let Some(format) = format {
                    obj.insert("format".into(), json!(format));
                }
                Value::Object(obj)
            }
            Self::GeoPoint { lat, lng } => json!({ "lat": lat, "lng": lng }),
            Self::Link { uri, title } => json!({ "uri": uri, "title": title }),
            Self::Reference {
                target_id,
                target_type,
            } => {
                let mut obj = Map::new();
                obj.insert("target_id".into(), target_id.to_json());
                if !target_type.is_empty() {
                    obj.insert("target_type".into(), json!(target_type));
                }
                Value::Object(obj)
            }
            Self::TypedRelation {
                target_id,
                rel_type,
                target_type,
            } => json!({
                "target_id": target_id.to_json(),
                "rel_type": rel_type,
                "target_type": target_type,
            }),
            Self::AuthorityLink { source, uri, title } => {
                json!({ "source": source, "uri": uri, "title": title })
            }
            Self::MediaTrack {
                label,
                kind,
                srclang,
                file_path,
            } => json!({
                "label": label,
                "kind": kind,
                "srclang": srclang,
                "file_path": file_path,
            }),
        }
    }
}

/// Ordered values of one field on one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldState(Vec<SubValue>);

impl FieldState {
    pub fn new(values: Vec<SubValue>) -> Self {
        Self(values)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubValue> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[SubValue] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<SubValue> {
        self.0
    }

    /// JSON array sent to the remote API.
    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().map(SubValue::to_json).collect())
    }

    /// Projects a field array from a remote entity into subvalues.
    ///
    /// Remote-only keys (`target_uuid`, `url`, `processed`, ...) are dropped
    /// so existing values compare equal to freshly parsed ones.
    pub fn from_json(def: &FieldDefinition, value: &Value) -> TypesResult<Self> {
        let items = match value {
            Value::Null => return Ok(Self::empty()),
            Value::Array(items) => items,
            other => {
                return Err(TypesError::UnexpectedJson(format!(
                    "expected array for {} field, got {other}",
                    def.kind
                )));
            }
        };

        let target_type = def.target_type.payload_name().to_string();
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let obj = item.as_object().ok_or_else(|| {
                TypesError::UnexpectedJson(format!("expected object in {} field, got {item}", def.kind))
            })?;
            let sub = match def.kind {
                FieldKind::Simple => SubValue::Scalar {
                    value: obj.get("value").cloned().ok_or_else(|| missing("value", item))?,
                    format: obj.get("format").and_then(Value::as_str).map(str::to_string),
                },
                FieldKind::Geolocation => SubValue::GeoPoint {
                    lat: required_string(obj, "lat", item)?,
                    lng: required_string(obj, "lng", item)?,
                },
                FieldKind::Link => SubValue::Link {
                    uri: required_string(obj, "uri", item)?,
                    title: optional_string(obj, "title"),
                },
                FieldKind::EntityReference => SubValue::Reference {
                    target_id: target_id(obj, item)?,
                    target_type: target_type.clone(),
                },
                FieldKind::TypedRelation => SubValue::TypedRelation {
                    target_id: target_id(obj, item)?,
                    rel_type: optional_string(obj, "rel_type"),
                    target_type: target_type.clone(),
                },
                FieldKind::AuthorityLink => SubValue::AuthorityLink {
                    source: optional_string(obj, "source"),
                    uri: required_string(obj, "uri", item)?,
                    title: optional_string(obj, "title"),
                },
                FieldKind::MediaTrack => SubValue::MediaTrack {
                    label: optional_string(obj, "label"),
                    kind: optional_string(obj, "kind"),
                    srclang: optional_string(obj, "srclang"),
                    file_path: match obj.get("file_path") {
                        Some(_) => optional_string(obj, "file_path"),
                        None => optional_string(obj, "target_id"),
                    },
                },
            };
            values.push(sub);
        }
        Ok(Self(values))
    }
}

impl FromIterator<SubValue> for FieldState {
    fn from_iter<I: IntoIterator<Item = SubValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FieldState {
    type Item = SubValue;
    type IntoIter = std::vec::IntoIter<SubValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldState {
    type Item = &'a SubValue;
    type IntoIter = std::slice::Iter<'a, SubValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn missing(key: &str, item: &Value) -> TypesError {
    TypesError::UnexpectedJson(format!("missing '{key}' in {item}"))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_string(obj: &Map<String, Value>, key: &str, item: &Value) -> TypesResult<String> {
    obj.get(key)
        .and_then(scalar_to_string)
        .ok_or_else(|| missing(key, item))
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).and_then(scalar_to_string).unwrap_or_default()
}

fn target_id(obj: &Map<String, Value>, item: &Value) -> TypesResult<TargetId> {
    match obj.get("target_id") {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(TargetId::Id)
            .ok_or_else(|| missing("target_id", item)),
        Some(Value::String(s)) => Ok(TargetId::from_raw(s)),
        _ => Err(missing("target_id", item)),
    }
}
