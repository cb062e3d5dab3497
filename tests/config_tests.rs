//! Integration tests for configuration loading and validation.

use bpaudit::test_support::EnvGuard;
use bpaudit::{AuditConfig, ConfigError};
use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use rstest::*;
use tempfile::TempDir;

struct ConfigDir {
    root: Utf8PathBuf,
    dir: Dir,
    _tmp: TempDir,
}

impl ConfigDir {
    fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        self.dir
            .write(name, contents)
            .unwrap_or_else(|err| panic!("write {name}: {err}"));
        self.root.join(name)
    }
}

#[fixture]
fn config_dir() -> ConfigDir {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    let dir = Dir::open_ambient_dir(&root, ambient_authority())
        .unwrap_or_else(|err| panic!("open temp dir: {err}"));
    ConfigDir {
        root,
        dir,
        _tmp: tmp,
    }
}

const LEGACY: &str = "\
azure:
  cloud: AzureUSGovernment
  subscription: 00000000-0000-0000-0000-000000000000
application:
  blueprintsDirectoryPath: /srv/blueprints
  updateBlueprintsDirectoryPath: /srv/update-blueprints
  targetKey: deploy_targets
  targetValue: nightly
  env: dev
  dc: dc1
";

#[rstest]
fn legacy_yaml_file_is_loaded(config_dir: ConfigDir) {
    let path = config_dir.write("config.yaml", LEGACY);

    let config = AuditConfig::from_legacy_yaml(&path)
        .unwrap_or_else(|err| panic!("legacy config should load: {err}"));

    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.cloud, "AzureUSGovernment");
    assert_eq!(config.subscription, "00000000-0000-0000-0000-000000000000");
    assert_eq!(config.blueprints_root(), Utf8PathBuf::from("/srv/blueprints"));
    assert_eq!(
        config.update_blueprints_root(),
        Utf8PathBuf::from("/srv/update-blueprints")
    );
    assert_eq!(config.az_bin, "az");
    let selection = config.selection();
    assert_eq!(
        (
            selection.target_key.as_str(),
            selection.target_value.as_str(),
            selection.environment.as_str(),
            selection.datacenter.as_str(),
        ),
        ("deploy_targets", "nightly", "dev", "dc1")
    );
}

#[rstest]
fn legacy_yaml_defaults_the_cloud(config_dir: ConfigDir) {
    let path = config_dir.write("config.yaml", &LEGACY.replace("  cloud: AzureUSGovernment\n", ""));

    let config = AuditConfig::from_legacy_yaml(&path)
        .unwrap_or_else(|err| panic!("legacy config should load: {err}"));

    assert_eq!(config.cloud, "AzureCloud");
}

#[rstest]
fn legacy_yaml_missing_field_is_actionable(config_dir: ConfigDir) {
    let path = config_dir.write("config.yaml", &LEGACY.replace("  dc: dc1\n", ""));

    let error = AuditConfig::from_legacy_yaml(&path).expect_err("datacenter is required");

    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(message.contains("application.dc"), "message: {message}");
    assert!(message.contains(path.as_str()), "message: {message}");
    assert!(!message.contains("BPAUDIT_DATACENTER"), "message: {message}");
}

#[rstest]
fn legacy_yaml_rejects_malformed_documents(config_dir: ConfigDir) {
    let path = config_dir.write("config.yaml", "azure: [unclosed\n");

    let error = AuditConfig::from_legacy_yaml(&path).expect_err("malformed yaml should fail");

    assert!(matches!(error, ConfigError::Parse(_)), "unexpected: {error:?}");
}

#[rstest]
fn legacy_yaml_reports_missing_file(config_dir: ConfigDir) {
    let missing = config_dir.root.join("absent.yaml");

    let error = AuditConfig::from_legacy_yaml(&missing).expect_err("missing file should fail");

    assert!(
        matches!(error, ConfigError::Read { ref path, .. } if *path == missing),
        "unexpected: {error:?}"
    );
}

#[tokio::test]
async fn environment_variables_populate_config() {
    let _guard = EnvGuard::set_vars(&[
        ("BPAUDIT_SUBSCRIPTION", "sub-env"),
        ("BPAUDIT_BLUEPRINTS_DIR", "/data/blueprints"),
        ("BPAUDIT_UPDATE_BLUEPRINTS_DIR", "/data/update-blueprints"),
        ("BPAUDIT_TARGET_KEY", "tags"),
        ("BPAUDIT_TARGET_VALUE", "audit"),
        ("BPAUDIT_ENVIRONMENT", "prd"),
        ("BPAUDIT_DATACENTER", "dc2"),
    ])
    .await;

    let config = AuditConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("env config should load: {err}"));

    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.subscription, "sub-env");
    assert_eq!(config.cloud, "AzureCloud");
    assert_eq!(config.az_bin, "az");
    assert_eq!(config.selection().datacenter, "dc2");
    assert_eq!(config.selection().environment, "prd");
}
