//! Pre-flight validation of input rows.
//!
//! Runs before any network call so that malformed values, cardinality
//! overflow and over-long values can be reported for the whole batch at once.

use crate::split::{self, LINK_TITLE_SEPARATOR};
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use workbench_types::{FieldDefinition, FieldKind, Row, SubValue};

static LATLONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[-+]?([1-8]?\d(\.\d+)?|90(\.0+)?),\s*[-+]?(180(\.0+)?|((1[0-7]\d)|([1-9]?\d))(\.\d+)?)$",
    )
    .expect("latlong pattern is valid")
});

static TYPED_RELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+:[A-Za-z0-9_]+:.+$").expect("typed relation pattern is valid")
});

/// Track kinds accepted by media track fields.
pub const MEDIA_TRACK_KINDS: [&str; 5] = ["subtitles", "descriptions", "metadata", "captions", "chapters"];

/// One `lat,lng` pair. A leading `\` before either coordinate is ignored.
pub fn validate_latlong_value(value: &str) -> bool {
    let cleaned: String = value
        .split(',')
        .map(|c| {
            let c = c.trim();
            c.strip_prefix('\\').unwrap_or(c)
        })
        .collect::<Vec<_>>()
        .join(",");
    LATLONG.is_match(&cleaned)
}

pub fn validate_link_value(uri: &str) -> bool {
    let uri = uri.trim();
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// One `source%%uri[%%title]` value. `sources` empty means any source.
pub fn validate_authority_link_value(value: &str, sources: &[String]) -> bool {
    let mut pieces = value.splitn(3, LINK_TITLE_SEPARATOR).map(str::trim);
    let (Some(source), Some(uri)) = (pieces.next(), pieces.next()) else {
        return false;
    };
    let source_ok = sources.is_empty() || sources.iter().any(|s| s == source);
    source_ok && validate_link_value(uri)
}

/// One `namespace:predicate:target` value.
pub fn validate_typed_relation_value(value: &str) -> bool {
    TYPED_RELATION.is_match(value.trim())
}

/// One `label:kind:srclang:file_path` value.
pub fn validate_media_track_value(value: &str) -> bool {
    match split::parse_media_track(value.trim()) {
        Some(SubValue::MediaTrack {
            label,
            kind,
            srclang,
            file_path,
        }) => {
            !label.is_empty()
                && MEDIA_TRACK_KINDS.contains(&kind.as_str())
                && !srclang.is_empty()
                && !file_path.is_empty()
        }
        _ => false,
    }
}

/// A problem found during pre-flight validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub row_id: String,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}, field {}: {}", self.row_id, self.field, self.message)
    }
}

/// Validates rows against the field definitions of one content type.
pub struct RowValidator<'a> {
    definitions: &'a BTreeMap<String, FieldDefinition>,
    subdelimiter: &'a str,
    reserved: Vec<String>,
    check_required: bool,
}

impl<'a> RowValidator<'a> {
    pub fn new(definitions: &'a BTreeMap<String, FieldDefinition>, subdelimiter: &'a str) -> Self {
        Self {
            definitions,
            subdelimiter,
            reserved: Vec::new(),
            check_required: false,
        }
    }

    /// Columns that are not fields (id, parent id, ...) and are not checked.
    #[must_use]
    pub fn with_reserved<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Also report required fields that are missing or blank (create tasks).
    #[must_use]
    pub fn require_required_fields(mut self) -> Self {
        self.check_required = true;
        self
    }

    pub fn validate(&self, rows: &[Row]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for row in rows {
            self.validate_row(row, &mut issues);
        }
        issues
    }

    fn validate_row(&self, row: &Row, issues: &mut Vec<ValidationIssue>) {
        let mut issue = |field: &str, message: String| {
            issues.push(ValidationIssue {
                row_id: row.id.clone(),
                field: field.to_string(),
                message,
            });
        };

        for (column, raw) in row.columns() {
            if self.reserved.iter().any(|r| r == column) {
                continue;
            }
            let Some(def) = self.definitions.get(column) else {
                issue(column, "column is not a field of this content type".to_string());
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }

            let parts: Vec<&str> = split::split_values(self.subdelimiter, raw).collect();
            for part in &parts {
                if let Some(problem) = self.check_value(def, part) {
                    issue(column, format!("'{part}' {problem}"));
                }
            }
            if let Some(limit) = def.cardinality.limit() {
                if parts.len() > limit {
                    issue(
                        column,
                        format!(
                            "{} values exceed maximum number of allowed values ({limit})",
                            parts.len()
                        ),
                    );
                }
            }
            if let Some(max) = def.max_length {
                if parts.iter().any(|p| p.chars().count() > max) {
                    issue(column, format!("value exceeds maximum length ({max})"));
                }
            }
        }

        if self.check_required {
            for (name, def) in self.definitions {
                if def.required && row.get_non_blank(name).is_none() {
                    issue(name, "required field is missing".to_string());
                }
            }
        }
    }

    fn check_value(&self, def: &FieldDefinition, part: &str) -> Option<&'static str> {
        let ok = match def.kind {
            FieldKind::Geolocation => validate_latlong_value(part),
            FieldKind::Link => validate_link_value(
                part.split_once(LINK_TITLE_SEPARATOR).map_or(part, |(uri, _)| uri),
            ),
            FieldKind::AuthorityLink => validate_authority_link_value(part, &def.authority_sources),
            FieldKind::TypedRelation => validate_typed_relation_value(part),
            FieldKind::MediaTrack => validate_media_track_value(part),
            FieldKind::Simple | FieldKind::EntityReference => true,
        };
        (!ok).then_some(match def.kind {
            FieldKind::Geolocation => "is not a valid lat,lng pair",
            FieldKind::Link => "is not an http(s) URI",
            FieldKind::AuthorityLink => "is not a valid source%%uri authority link",
            FieldKind::TypedRelation => "is not a namespace:predicate:target typed relation",
            _ => "is not a valid label:kind:srclang:path media track",
        })
    }
}
