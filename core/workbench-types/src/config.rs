//! Run configuration, loaded from a YAML file.

use crate::error::{TypesError, TypesResult};
use crate::row::UpdateMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `password` is absent from the config.
pub const PASSWORD_ENV_VAR: &str = "WORKBENCH_PASSWORD";

/// Batch task to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Create,
    Update,
    Delete,
}

/// Options for one run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    pub task: Task,
    pub host: String,
    pub username: String,
    pub password: Option<String>,
    pub input_dir: PathBuf,
    pub input_csv: String,
    pub id_field: String,
    pub content_type: String,
    pub delimiter: char,
    pub subdelimiter: String,
    pub update_mode: UpdateMode,
    pub max_node_title_length: usize,
    pub allow_adding_terms: bool,
    pub published: bool,
    pub text_format_id: String,
    /// Per-field overrides of `text_format_id`.
    pub field_text_format_ids: BTreeMap<String, String>,
    pub parent_id_field: String,
    pub parent_field: String,
    /// Link children to parents created by earlier runs of this config
    /// when the parent row is not part of the current input.
    pub query_csv_id_to_node_id_map_for_parents: bool,
    pub csv_id_to_node_id_map_path: Option<PathBuf>,
    pub user_agent: String,
    pub secure_ssl_only: bool,
    pub http_timeout_secs: u64,
    pub log_file_path: PathBuf,
    pub log_level: String,
    pub ignore_csv_columns: Vec<String>,
    /// Path of the config file as given by the operator. Recorded in the
    /// identity map as the config identity.
    #[serde(skip)]
    pub config_file: String,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            task: Task::Create,
            host: String::new(),
            username: String::new(),
            password: None,
            input_dir: PathBuf::from("input_data"),
            input_csv: "metadata.csv".to_string(),
            id_field: "id".to_string(),
            content_type: "islandora_object".to_string(),
            delimiter: ',',
            subdelimiter: "|".to_string(),
            update_mode: UpdateMode::Replace,
            max_node_title_length: 255,
            allow_adding_terms: false,
            published: true,
            text_format_id: "basic_html".to_string(),
            field_text_format_ids: BTreeMap::new(),
            parent_id_field: "parent_id".to_string(),
            parent_field: "field_member_of".to_string(),
            query_csv_id_to_node_id_map_for_parents: false,
            csv_id_to_node_id_map_path: None,
            user_agent: "Islandora Workbench".to_string(),
            secure_ssl_only: true,
            http_timeout_secs: 60,
            log_file_path: PathBuf::from("workbench.log"),
            log_level: "info".to_string(),
            ignore_csv_columns: Vec::new(),
            config_file: String::new(),
        }
    }
}

impl WorkbenchConfig {
    /// Reads and validates a config file. `config_file` is set to `path`
    /// exactly as given.
    pub fn load(path: impl AsRef<Path>) -> TypesResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TypesError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw, &path.to_string_lossy())
    }

    pub fn from_yaml_str(raw: &str, config_file: &str) -> TypesResult<Self> {
        let mut config: Self = serde_yaml::from_str(raw)?;
        config.config_file = config_file.to_string();
        config.host = config.host.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> TypesResult<()> {
        if self.host.is_empty() {
            return Err(TypesError::MissingOption("host"));
        }
        if self.id_field.is_empty() {
            return Err(TypesError::MissingOption("id_field"));
        }
        if self.subdelimiter.is_empty() {
            return Err(TypesError::MissingOption("subdelimiter"));
        }
        Ok(())
    }

    /// Password from the config, else from [`PASSWORD_ENV_VAR`].
    pub fn resolved_password(&self) -> Option<String> {
        self.password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV_VAR).ok())
    }

    pub fn input_csv_path(&self) -> PathBuf {
        self.input_dir.join(&self.input_csv)
    }

    /// Location of the identity map database.
    pub fn id_map_path(&self) -> PathBuf {
        self.csv_id_to_node_id_map_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("csv_id_to_node_id_map.db"))
    }

    /// Text format for a formatted text field.
    pub fn text_format_for(&self, field_name: &str) -> &str {
        self.field_text_format_ids
            .get(field_name)
            .map_or(self.text_format_id.as_str(), String::as_str)
    }
}
