//! Typed model of blueprint documents.
//!
//! Blueprints arrive as loosely-typed YAML. Parsing keeps the document
//! identity (`platform`, `boundary`, `name`) strict and treats every nested
//! field as optional: an environment entry, VM declaration, or network block
//! with the wrong shape is dropped or left absent, so traversal simply yields
//! nothing further down that branch.

mod selector;

use std::collections::BTreeMap;
use std::fmt;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

pub use selector::{Selection, is_in_scope, matching_environments};

const PLATFORM_KEY: &str = "platform";
const BOUNDARY_KEY: &str = "boundary";
const NAME_KEY: &str = "name";
const ENVIRONMENT_SPECIFIC_KEY: &str = "environment_specific";
const ENVIRONMENT_KEY: &str = "environment";
const DATACENTER_KEY: &str = "datacenter";
const VIRTUAL_MACHINES_KEY: &str = "virtual_machines";
const COUNT_KEY: &str = "count";
const OS_KEY: &str = "os";
const NETWORKS_KEY: &str = "networks";
const ADDRESS_KEY: &str = "address";
const INFRASTRUCTURE_BLUEPRINT_KEY: &str = "infrastructure_blueprint";

/// Errors raised when a file cannot be interpreted as a blueprint at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DocumentError {
    /// Raised when the YAML itself is invalid.
    #[error("invalid YAML: {0}")]
    Yaml(String),
    /// Raised when the document root is not a mapping.
    #[error("document root is not a mapping")]
    NotAMapping,
    /// Raised when one of the identity fields is absent or not a string.
    #[error("missing blueprint identity field '{field}'")]
    MissingIdentity {
        /// Name of the absent identity field.
        field: &'static str,
    },
}

/// Platform, boundary and name of a blueprint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlueprintIdentity {
    /// Platform the blueprint belongs to.
    pub platform: String,
    /// Security or network boundary of the platform.
    pub boundary: String,
    /// Blueprint name, unique within platform and boundary.
    pub name: String,
}

impl BlueprintIdentity {
    /// Returns the `platform-boundary-name` identifier (the PBN).
    #[must_use]
    pub fn pbn(&self) -> String {
        format!("{}-{}-{}", self.platform, self.boundary, self.name)
    }

    /// Compares the PBN against a reference, ignoring ASCII case.
    #[must_use]
    pub fn matches_pbn(&self, reference: &str) -> bool {
        self.pbn().eq_ignore_ascii_case(reference)
    }
}

impl fmt::Display for BlueprintIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.platform, self.boundary, self.name)
    }
}

/// Value of a top-level document key that may be used for scope selection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagValue {
    /// A sequence; only its string items are retained.
    List(Vec<String>),
    /// Any other YAML value.
    Other,
}

/// Operating system family of a VM, which selects the naming convention.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OsFamily {
    /// Windows hosts, named `<base>-<ordinal>`.
    Windows,
    /// Every other OS label, named with the full placement prefix.
    Linux,
}

impl OsFamily {
    /// Maps an OS label to its family; only `windows` (any case) is Windows.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

/// Declared addresses of one VM network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkSpec {
    /// Expected private IP per VM instance, in ordinal order.
    pub addresses: Vec<String>,
}

/// Declaration of a group of identical VMs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VmSpec {
    /// Base name used when deriving instance names.
    pub name: Option<String>,
    /// Number of instances; absent when missing, non-integer, or zero.
    pub count: Option<u32>,
    /// Operating system family.
    pub os_family: Option<OsFamily>,
    /// Declared networks; malformed network blocks are dropped.
    pub networks: Vec<NetworkSpec>,
    /// PBN of the base blueprint, present on update-blueprint VMs.
    pub infrastructure_blueprint: Option<String>,
}

/// The fields required to derive instance names for a [`VmSpec`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeclaredVm<'a> {
    /// Base name of the VM group.
    pub name: &'a str,
    /// Number of instances, always at least one.
    pub count: u32,
    /// Operating system family.
    pub os_family: OsFamily,
}

impl VmSpec {
    /// Returns the naming inputs when name, count and OS are all present.
    #[must_use]
    pub fn declared(&self) -> Option<DeclaredVm<'_>> {
        Some(DeclaredVm {
            name: self.name.as_deref()?,
            count: self.count?,
            os_family: self.os_family?,
        })
    }

    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_mapping()?;
        Some(Self {
            name: string_field(map, NAME_KEY),
            count: map
                .get(COUNT_KEY)
                .and_then(Value::as_u64)
                .and_then(|count| u32::try_from(count).ok())
                .filter(|count| *count > 0),
            os_family: map
                .get(OS_KEY)
                .and_then(Value::as_str)
                .map(OsFamily::from_label),
            networks: sequence_field(map, NETWORKS_KEY)
                .filter_map(NetworkSpec::from_value)
                .collect(),
            infrastructure_blueprint: string_field(map, INFRASTRUCTURE_BLUEPRINT_KEY),
        })
    }
}

impl NetworkSpec {
    fn from_value(value: &Value) -> Option<Self> {
        let addresses = value.as_mapping()?.get(ADDRESS_KEY)?.as_sequence()?;
        let parsed = addresses
            .iter()
            .map(|address| address.as_str().map(str::to_owned))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { addresses: parsed })
    }
}

/// One entry of a blueprint's `environment_specific` list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnvironmentEntry {
    /// Environment label, for example `dev`.
    pub environment: Option<String>,
    /// Datacenter label, for example `dc1`.
    pub datacenter: Option<String>,
    /// VM declarations; entries that are not mappings are dropped.
    pub virtual_machines: Vec<VmSpec>,
}

impl EnvironmentEntry {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_mapping()?;
        Some(Self {
            environment: string_field(map, ENVIRONMENT_KEY),
            datacenter: string_field(map, DATACENTER_KEY),
            virtual_machines: sequence_field(map, VIRTUAL_MACHINES_KEY)
                .filter_map(VmSpec::from_value)
                .collect(),
        })
    }

    /// Returns `true` when both labels are present and equal the arguments.
    #[must_use]
    pub fn is_placed_in(&self, environment: &str, datacenter: &str) -> bool {
        self.environment.as_deref() == Some(environment)
            && self.datacenter.as_deref() == Some(datacenter)
    }
}

/// A parsed blueprint or update-blueprint document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlueprintDocument {
    /// Identity triple.
    pub identity: BlueprintIdentity,
    /// Every top-level key, available for scope selection.
    pub tags: BTreeMap<String, TagValue>,
    /// Per-environment declarations in source order.
    pub environments: Vec<EnvironmentEntry>,
}

impl BlueprintDocument {
    /// Parses a document from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the text is not YAML, the root is not a
    /// mapping, or an identity field is missing.
    pub fn from_yaml_str(source: &str) -> Result<Self, DocumentError> {
        let value: Value =
            serde_yaml::from_str(source).map_err(|err| DocumentError::Yaml(err.to_string()))?;
        Self::from_value(&value)
    }

    /// Builds a document from an already parsed YAML value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the root is not a mapping or an identity
    /// field is missing.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let map = value.as_mapping().ok_or(DocumentError::NotAMapping)?;
        let identity = BlueprintIdentity {
            platform: required_string(map, PLATFORM_KEY)?,
            boundary: required_string(map, BOUNDARY_KEY)?,
            name: required_string(map, NAME_KEY)?,
        };

        let tags = map
            .iter()
            .filter_map(|(key, tag)| Some((key.as_str()?.to_owned(), TagValue::from_value(tag))))
            .collect();

        let environments = sequence_field(map, ENVIRONMENT_SPECIFIC_KEY)
            .filter_map(EnvironmentEntry::from_value)
            .collect();

        Ok(Self {
            identity,
            tags,
            environments,
        })
    }

    /// Returns the document's PBN.
    #[must_use]
    pub fn pbn(&self) -> String {
        self.identity.pbn()
    }
}

impl TagValue {
    fn from_value(value: &Value) -> Self {
        value.as_sequence().map_or(Self::Other, |items| {
            Self::List(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect(),
            )
        })
    }
}

fn string_field(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn required_string(map: &Mapping, key: &'static str) -> Result<String, DocumentError> {
    string_field(map, key).ok_or(DocumentError::MissingIdentity { field: key })
}

fn sequence_field<'a>(map: &'a Mapping, key: &str) -> impl Iterator<Item = &'a Value> + use<'a> {
    map.get(key)
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
}
