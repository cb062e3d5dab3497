//! Core library for the `bpaudit` blueprint audit tool.
//!
//! Blueprints are YAML documents declaring the virtual machines a platform
//! should run in each datacenter and environment. The crate loads a corpus of
//! them, derives the canonical cloud resource names, and reconciles the
//! declarations against the live inventory: VM existence, VM private IPs, and
//! update blueprints that reference a base blueprint.

pub mod audit;
pub mod blueprint;
pub mod config;
pub mod corpus;
pub mod inventory;
pub mod naming;
pub mod report;
pub mod test_support;

pub use audit::{Auditor, CheckKind, Finding, FindingKind, Origin};
pub use blueprint::{BlueprintDocument, BlueprintIdentity, DocumentError, OsFamily, Selection};
pub use config::{AuditConfig, ConfigError};
pub use corpus::{Corpus, CorpusError, LoadedDocument};
pub use inventory::{
    AzureCliOracle, CommandRunner, InventoryOracle, OracleError, ProcessCommandRunner,
    RunnerError, VmPresence,
};
pub use report::{AuditKind, AuditReport, RunStatus};
