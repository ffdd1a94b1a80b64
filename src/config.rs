use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

use charsheet_core::{
    ColumnSchema, Credential, Role, SchemaError, StoreConfig, ValueInputOption, ValueRenderOption,
    DEFAULT_COLLECTION_LABEL, DEFAULT_PAGE_SIZE, DEFAULT_TEMPLATE_ID,
};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// One column of the sheet layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Field key used to address the column
    pub key: String,
    /// label, editable or formula
    pub role: Role,
    /// Column letters, e.g. "B"
    pub column: String,
}

/// Where records live inside each spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Tab name
    pub sheet: String,
    /// First row of the read range (1-based)
    pub first_row: u32,
    /// Last row of the read range (inclusive)
    pub last_row: u32,
    pub columns: Vec<ColumnConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sheet: "Sheet1".to_string(),
            first_row: 1,
            last_row: 100,
            columns: vec![
                ColumnConfig {
                    key: "stat".to_string(),
                    role: Role::Label,
                    column: "A".to_string(),
                },
                ColumnConfig {
                    key: "value".to_string(),
                    role: Role::Editable,
                    column: "B".to_string(),
                },
            ],
        }
    }
}

impl LayoutConfig {
    /// Validate the layout into a column schema
    pub fn to_schema(&self) -> Result<ColumnSchema, SchemaError> {
        self.columns
            .iter()
            .fold(
                ColumnSchema::builder(&self.sheet).rows(self.first_row, self.last_row),
                |builder, c| builder.column(&c.key, c.role, &c.column),
            )
            .build()
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Substring shared by the names of all character sheets
    pub collection_label: ConfigValue<String>,
    /// Spreadsheet copied when creating a character
    pub template_id: ConfigValue<String>,
    /// OAuth bearer token
    #[serde(serialize_with = "redact_token")]
    pub access_token: ConfigValue<Option<String>>,
    /// When the access token stops being valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Scopes the access token was granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_scopes: Option<Vec<String>>,
    pub value_input: ConfigValue<ValueInputOption>,
    pub value_render: ConfigValue<ValueRenderOption>,
    /// Per-request timeout in seconds
    pub timeout_secs: ConfigValue<u64>,
    pub layout: ConfigValue<LayoutConfig>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    collection_label: Option<String>,
    template_id: Option<String>,
    access_token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    token_scopes: Option<Vec<String>>,
    value_input: Option<ValueInputOption>,
    value_render: Option<ValueRenderOption>,
    timeout_secs: Option<u64>,
    layout: Option<LayoutConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut collection_label =
            ConfigValue::new(DEFAULT_COLLECTION_LABEL.to_string(), ConfigSource::Default);
        let mut template_id =
            ConfigValue::new(DEFAULT_TEMPLATE_ID.to_string(), ConfigSource::Default);
        let mut access_token = ConfigValue::new(None, ConfigSource::Default);
        let mut value_input = ConfigValue::new(ValueInputOption::default(), ConfigSource::Default);
        let mut value_render =
            ConfigValue::new(ValueRenderOption::default(), ConfigSource::Default);
        let mut timeout_secs = ConfigValue::new(30, ConfigSource::Default);
        let mut layout = ConfigValue::new(LayoutConfig::default(), ConfigSource::Default);
        let mut token_expires_at = None;
        let mut token_scopes = None;
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(label) = file_config.collection_label {
                collection_label = ConfigValue::new(label, ConfigSource::File);
            }
            if let Some(id) = file_config.template_id {
                template_id = ConfigValue::new(id, ConfigSource::File);
            }
            if let Some(token) = file_config.access_token {
                access_token = ConfigValue::new(Some(token), ConfigSource::File);
            }
            if let Some(input) = file_config.value_input {
                value_input = ConfigValue::new(input, ConfigSource::File);
            }
            if let Some(render) = file_config.value_render {
                value_render = ConfigValue::new(render, ConfigSource::File);
            }
            if let Some(secs) = file_config.timeout_secs {
                timeout_secs = ConfigValue::new(secs, ConfigSource::File);
            }
            if let Some(file_layout) = file_config.layout {
                layout = ConfigValue::new(file_layout, ConfigSource::File);
            }
            token_expires_at = file_config.token_expires_at;
            token_scopes = file_config.token_scopes;
        }

        // Apply environment variable overrides
        if let Ok(label) = std::env::var("CHARSHEET_COLLECTION_LABEL") {
            collection_label = ConfigValue::new(label, ConfigSource::Environment);
        }
        if let Ok(id) = std::env::var("CHARSHEET_TEMPLATE_ID") {
            template_id = ConfigValue::new(id, ConfigSource::Environment);
        }
        if let Ok(token) = std::env::var("CHARSHEET_ACCESS_TOKEN") {
            // A token from the environment carries no expiry or scope info
            access_token = ConfigValue::new(Some(token), ConfigSource::Environment);
            token_expires_at = None;
            token_scopes = None;
        }

        Ok(Self {
            collection_label,
            template_id,
            access_token,
            token_expires_at,
            token_scopes,
            value_input,
            value_render,
            timeout_secs,
            layout,
            config_file,
        })
    }

    /// Credential built from the configured token, if any
    pub fn credential(&self) -> Option<Credential> {
        let token = self.access_token.value.as_deref()?.trim();
        if token.is_empty() {
            return None;
        }

        let mut credential = Credential::new(token);
        if let Some(expires_at) = self.token_expires_at {
            credential = credential.with_expiry(expires_at);
        }
        if let Some(scopes) = &self.token_scopes {
            credential = credential.with_scopes(scopes.iter().cloned());
        }
        Some(credential)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            collection_label: self.collection_label.value.clone(),
            template_id: self.template_id.value.clone(),
            page_size: DEFAULT_PAGE_SIZE,
            value_input: self.value_input.value,
            value_render: self.value_render.value,
        }
    }

    pub fn schema(&self) -> Result<ColumnSchema, SchemaError> {
        self.layout.value.to_schema()
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/charsheet/
    /// - macOS: ~/Library/Application Support/charsheet/
    /// - Windows: %APPDATA%/charsheet/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("charsheet")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn redact_token<S>(token: &ConfigValue<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ConfigValue::new(
        token.value.as_ref().map(|_| "********"),
        token.source.clone(),
    )
    .serialize(serializer)
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
