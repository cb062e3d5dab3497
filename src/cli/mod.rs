//! Command-line interface definitions for the `bpaudit` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Top-level CLI for the `bpaudit` binary.
#[derive(Debug, Parser)]
#[command(
    name = "bpaudit",
    about = "Audit infrastructure blueprints against the live cloud inventory",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Audit to run.
    #[command(subcommand)]
    pub(crate) scope: AuditScope,
    /// Read settings from a YAML file with `azure` and `application`
    /// sections instead of `bpaudit.toml` and `BPAUDIT_*` variables.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config: Option<Utf8PathBuf>,
    /// Reuse the current Azure CLI session without selecting the cloud or
    /// logging in.
    #[arg(long, global = true)]
    pub(crate) skip_login: bool,
    /// Log at debug level, including every `az` command line.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
}

/// Which audits a run performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Subcommand)]
pub(crate) enum AuditScope {
    /// Check that every declared VM exists.
    Blueprints,
    /// Check that every update blueprint references a matching blueprint.
    UpdateBlueprints,
    /// Check that every declared VM holds its declared private IP.
    BlueprintsIps,
    /// Run the update-blueprint, existence and IP audits in that order.
    All,
}

impl AuditScope {
    /// Returns `true` when the update-blueprint cross-reference runs.
    pub(crate) const fn audits_update_blueprints(self) -> bool {
        matches!(self, Self::UpdateBlueprints | Self::All)
    }

    /// Returns `true` when the VM existence audit runs.
    pub(crate) const fn audits_existence(self) -> bool {
        matches!(self, Self::Blueprints | Self::All)
    }

    /// Returns `true` when the VM IP audit runs.
    pub(crate) const fn audits_ips(self) -> bool {
        matches!(self, Self::BlueprintsIps | Self::All)
    }
}
