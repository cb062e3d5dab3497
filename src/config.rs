//! Configuration loading via `ortho-config`, plus the legacy YAML layout.

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::blueprint::Selection;
use crate::inventory::DEFAULT_AZ_BIN;

/// Cloud selected when none is configured.
pub const DEFAULT_CLOUD: &str = "AzureCloud";

/// Audit settings derived from configuration files, environment variables and
/// defaults.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "BPAUDIT",
    discovery(
        app_name = "bpaudit",
        env_var = "BPAUDIT_CONFIG_PATH",
        config_file_name = "bpaudit.toml",
        dotfile_name = ".bpaudit.toml",
        project_file_name = "bpaudit.toml"
    )
)]
pub struct AuditConfig {
    /// Name of the cloud passed to `az cloud set`. Defaults to `AzureCloud`.
    #[ortho_config(default = DEFAULT_CLOUD.to_owned())]
    pub cloud: String,
    /// Subscription every inventory query runs against.
    pub subscription: String,
    /// Root directory of the blueprint corpus.
    pub blueprints_dir: String,
    /// Root directory of the update-blueprint corpus.
    pub update_blueprints_dir: String,
    /// Top-level key whose list marks a document as in scope.
    pub target_key: String,
    /// Value that must appear in the `target_key` list.
    pub target_value: String,
    /// Environment label to audit, for example `dev`.
    pub environment: String,
    /// Datacenter label to audit, for example `dc1`.
    pub datacenter: String,
    /// Path to the Azure CLI executable.
    #[ortho_config(default = DEFAULT_AZ_BIN.to_owned())]
    pub az_bin: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
    legacy_key: Option<&'static str>,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
            legacy_key: None,
        }
    }

    const fn legacy(mut self, key: &'static str) -> Self {
        self.legacy_key = Some(key);
        self
    }

    fn layered_hint(&self) -> String {
        format!(
            "missing {}: set {} or add {} to bpaudit.toml",
            self.description, self.env_var, self.toml_key
        )
    }

    fn legacy_hint(&self, path: &Utf8Path) -> String {
        self.legacy_key.map_or_else(
            || self.layered_hint(),
            |key| format!("missing {}: add {key} to {path}", self.description),
        )
    }
}

impl AuditConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("bpaudit")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads the nested `azure` / `application` YAML layout used by older
    /// deployments of the tool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read,
    /// [`ConfigError::Parse`] when it is not valid YAML of that shape and
    /// [`ConfigError::MissingField`], naming the nested key, when a required
    /// value is absent.
    pub fn from_legacy_yaml(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = read_file(path)?;
        let legacy: LegacyFile = serde_yaml::from_str(&contents)
            .map_err(|err| ConfigError::Parse(format!("{path}: {err}")))?;
        let config = Self::from(legacy);
        config.check_required(|metadata| metadata.legacy_hint(path))?;
        Ok(config)
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_required(FieldMetadata::layered_hint)
    }

    fn check_required(
        &self,
        hint: impl Fn(&FieldMetadata) -> String,
    ) -> Result<(), ConfigError> {
        let required = [
            (
                &self.cloud,
                FieldMetadata::new("cloud name", "BPAUDIT_CLOUD", "cloud").legacy("azure.cloud"),
            ),
            (
                &self.subscription,
                FieldMetadata::new("subscription", "BPAUDIT_SUBSCRIPTION", "subscription")
                    .legacy("azure.subscription"),
            ),
            (
                &self.blueprints_dir,
                FieldMetadata::new(
                    "blueprints directory",
                    "BPAUDIT_BLUEPRINTS_DIR",
                    "blueprints_dir",
                )
                .legacy("application.blueprintsDirectoryPath"),
            ),
            (
                &self.update_blueprints_dir,
                FieldMetadata::new(
                    "update blueprints directory",
                    "BPAUDIT_UPDATE_BLUEPRINTS_DIR",
                    "update_blueprints_dir",
                )
                .legacy("application.updateBlueprintsDirectoryPath"),
            ),
            (
                &self.target_key,
                FieldMetadata::new("target key", "BPAUDIT_TARGET_KEY", "target_key")
                    .legacy("application.targetKey"),
            ),
            (
                &self.target_value,
                FieldMetadata::new("target value", "BPAUDIT_TARGET_VALUE", "target_value")
                    .legacy("application.targetValue"),
            ),
            (
                &self.environment,
                FieldMetadata::new("environment", "BPAUDIT_ENVIRONMENT", "environment")
                    .legacy("application.env"),
            ),
            (
                &self.datacenter,
                FieldMetadata::new("datacenter", "BPAUDIT_DATACENTER", "datacenter")
                    .legacy("application.dc"),
            ),
            (
                &self.az_bin,
                FieldMetadata::new("Azure CLI path", "BPAUDIT_AZ_BIN", "az_bin"),
            ),
        ];
        required
            .iter()
            .find(|(value, _)| value.trim().is_empty())
            .map_or(Ok(()), |(_, metadata)| {
                Err(ConfigError::MissingField(hint(metadata)))
            })
    }

    /// The scope this configuration selects.
    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection {
            target_key: self.target_key.clone(),
            target_value: self.target_value.clone(),
            environment: self.environment.clone(),
            datacenter: self.datacenter.clone(),
        }
    }

    /// Root directory of the blueprint corpus.
    #[must_use]
    pub fn blueprints_root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.blueprints_dir)
    }

    /// Root directory of the update-blueprint corpus.
    #[must_use]
    pub fn update_blueprints_root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.update_blueprints_dir)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyFile {
    azure: LegacyAzure,
    application: LegacyApplication,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyAzure {
    cloud: Option<String>,
    subscription: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LegacyApplication {
    blueprints_directory_path: String,
    update_blueprints_directory_path: String,
    target_key: String,
    target_value: String,
    env: String,
    dc: String,
}

impl From<LegacyFile> for AuditConfig {
    fn from(legacy: LegacyFile) -> Self {
        let LegacyFile { azure, application } = legacy;
        Self {
            cloud: azure
                .cloud
                .filter(|cloud| !cloud.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLOUD.to_owned()),
            subscription: azure.subscription,
            blueprints_dir: application.blueprints_directory_path,
            update_blueprints_dir: application.update_blueprints_directory_path,
            target_key: application.target_key,
            target_value: application.target_value,
            environment: application.env,
            datacenter: application.dc,
            az_bin: DEFAULT_AZ_BIN.to_owned(),
        }
    }
}

fn read_file(path: &Utf8Path) -> Result<String, ConfigError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| ConfigError::Read {
        path: path.to_path_buf(),
        message: String::from("configuration file path is missing a filename"),
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| {
        ConfigError::Read {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }
    })?;

    dir.read_to_string(file_name)
        .map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader or the YAML parser.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when a configuration file cannot be read.
    #[error("failed to read configuration {path}: {message}")]
    Read {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
}
