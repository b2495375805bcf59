//! Field definitions as reported by the remote schema.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a field's values. Chosen once from the remote field type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Simple,
    Geolocation,
    Link,
    EntityReference,
    TypedRelation,
    AuthorityLink,
    MediaTrack,
}

impl FieldKind {
    /// Maps a remote field type (e.g. `"typed_relation"`) to its shape.
    /// Any type without a structured shape is `Simple`.
    #[must_use]
    pub fn from_field_type(field_type: &str) -> Self {
        match field_type {
            "geolocation" => Self::Geolocation,
            "link" => Self::Link,
            "entity_reference" | "entity_reference_revisions" => Self::EntityReference,
            "typed_relation" => Self::TypedRelation,
            "authority_link" => Self::AuthorityLink,
            "media_track" => Self::MediaTrack,
            _ => Self::Simple,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Geolocation => "geolocation",
            Self::Link => "link",
            Self::EntityReference => "entity_reference",
            Self::TypedRelation => "typed_relation",
            Self::AuthorityLink => "authority_link",
            Self::MediaTrack => "media_track",
        };
        f.write_str(name)
    }
}

/// Maximum number of values a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Cardinality {
    Unbounded,
    Bounded(usize),
}

impl Cardinality {
    pub const SINGLE: Self = Self::Bounded(1);

    /// The bound, if any.
    #[must_use]
    pub const fn limit(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(n) => Some(n),
        }
    }

    #[must_use]
    pub const fn is_singular(self) -> bool {
        matches!(self, Self::Bounded(1))
    }
}

impl From<i64> for Cardinality {
    /// `-1` (or any non-positive value) is unbounded.
    fn from(raw: i64) -> Self {
        if raw < 1 {
            Self::Unbounded
        } else {
            Self::Bounded(raw as usize)
        }
    }
}

impl From<Cardinality> for i64 {
    fn from(c: Cardinality) -> Self {
        match c {
            Cardinality::Unbounded => -1,
            Cardinality::Bounded(n) => n as i64,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// Entity type a reference field points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[default]
    None,
    TaxonomyTerm,
    Node,
    Media,
}

impl TargetType {
    /// Parses the `target_type` setting of a field storage config.
    #[must_use]
    pub fn from_setting(setting: &str) -> Self {
        match setting {
            "taxonomy_term" => Self::TaxonomyTerm,
            "node" => Self::Node,
            "media" => Self::Media,
            _ => Self::None,
        }
    }

    /// Value the remote API expects in a reference's `target_type` key.
    #[must_use]
    pub const fn payload_name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::TaxonomyTerm => "taxonomy_term",
            Self::Node => "node_type",
            Self::Media => "media_type",
        }
    }
}

/// Per-run, read-only description of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub field_type: String,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub target_type: TargetType,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub label: String,
    /// Vocabularies a taxonomy reference may target.
    #[serde(default)]
    pub vocabularies: Vec<String>,
    /// Allowed `source` keys of an authority link field.
    #[serde(default)]
    pub authority_sources: Vec<String>,
    /// Allowed keys of a `list_*` field.
    #[serde(default)]
    pub allowed_values: Vec<String>,
    /// Whether values carry a text format.
    #[serde(default)]
    pub formatted_text: bool,
}

impl FieldDefinition {
    /// `cardinality` uses the remote convention: `-1` is unbounded.
    pub fn new(field_type: impl Into<String>, cardinality: i64) -> Self {
        let field_type = field_type.into();
        let kind = FieldKind::from_field_type(&field_type);
        let formatted_text = matches!(
            field_type.as_str(),
            "text" | "text_long" | "text_with_summary"
        );
        Self {
            field_type,
            kind,
            cardinality: Cardinality::from(cardinality),
            target_type: TargetType::None,
            max_length: None,
            required: false,
            label: String::new(),
            vocabularies: Vec::new(),
            authority_sources: Vec::new(),
            allowed_values: Vec::new(),
            formatted_text,
        }
    }

    /// The node title: a required, singular string field.
    pub fn title(max_length: usize) -> Self {
        Self {
            required: true,
            label: "Title".to_string(),
            max_length: Some(max_length),
            ..Self::new("string", 1)
        }
    }

    #[must_use]
    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn with_vocabularies<I, S>(mut self, vocabularies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabularies = vocabularies.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_authority_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authority_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
