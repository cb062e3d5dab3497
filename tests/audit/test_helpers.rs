//! Shared fixtures and helpers for audit BDD scenarios.

use bpaudit::test_support::ScriptedOracle;
use bpaudit::{AuditReport, BlueprintDocument, Corpus, LoadedDocument, Selection};
use camino::Utf8PathBuf;
use rstest::fixture;

pub const SUBSCRIPTION: &str = "sub-bdd";
const TARGET_KEY: &str = "tags";
const TARGET_VALUE: &str = "audit";

#[derive(Clone, Debug)]
pub struct AuditContext {
    pub selection: Selection,
    pub blueprints: Vec<LoadedDocument>,
    pub updates: Vec<LoadedDocument>,
    pub oracle: ScriptedOracle,
    pub report: Option<AuditReport>,
}

impl AuditContext {
    pub fn blueprint_corpus(&self) -> Corpus {
        Corpus::from_documents(self.blueprints.clone())
    }

    pub fn update_corpus(&self) -> Corpus {
        Corpus::from_documents(self.updates.clone())
    }
}

#[fixture]
pub fn audit_context() -> AuditContext {
    AuditContext {
        selection: Selection {
            target_key: String::from(TARGET_KEY),
            target_value: String::from(TARGET_VALUE),
            environment: String::from("dev"),
            datacenter: String::from("dc1"),
        },
        blueprints: Vec::new(),
        updates: Vec::new(),
        oracle: ScriptedOracle::new(),
        report: None,
    }
}

/// Renders a `web`/`prod` blueprint holding one VM group for the selection's
/// placement.
pub fn blueprint_yaml(selection: &Selection, name: &str, vm_fields: &str) -> String {
    format!(
        "platform: web\nboundary: prod\nname: {name}\n{TARGET_KEY}: [{TARGET_VALUE}]\n\
         environment_specific:\n  - environment: {}\n    datacenter: {}\n    \
         virtual_machines:\n      - {vm_fields}\n",
        selection.environment, selection.datacenter
    )
}

pub fn load(name: &str, source: &str) -> LoadedDocument {
    LoadedDocument {
        path: Utf8PathBuf::from(format!("{name}.yaml")),
        document: BlueprintDocument::from_yaml_str(source)
            .unwrap_or_else(|err| panic!("fixture {name} should parse: {err}")),
    }
}
