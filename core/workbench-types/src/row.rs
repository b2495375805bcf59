//! Input rows and update policies.

use crate::error::TypesError;
use crate::ids::RemoteId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One record of tabular input.
///
/// Columns keep their input order; the id column is also held separately so
/// callers never have to know which header was configured as `id_field`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub remote_id: Option<RemoteId>,
    columns: Vec<(String, String)>,
}

impl Row {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_id: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_remote_id(mut self, remote_id: impl Into<RemoteId>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_column(name, value);
        self
    }

    /// Appends a column, replacing the value if the header already exists.
    pub fn push_column(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Raw cell value for a column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Raw cell value, treating whitespace-only cells as absent.
    #[must_use]
    pub fn get_non_blank(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// How incoming values combine with a field's existing values on update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    #[default]
    Replace,
    Append,
    Delete,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Append => write!(f, "append"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for UpdateMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            "delete" => Ok(Self::Delete),
            other => Err(TypesError::InvalidUpdateMode(other.to_string())),
        }
    }
}
