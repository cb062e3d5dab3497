//! Azure CLI implementation of the inventory oracle.

use std::ffi::OsString;

use super::{CommandOutput, CommandRunner, InventoryOracle, OracleError, VmPresence};

/// Default Azure CLI binary name.
pub const DEFAULT_AZ_BIN: &str = "az";

const RESOURCE_GROUP_NOT_FOUND: &str = "ResourceGroupNotFound";
const RESOURCE_NOT_FOUND: &str = "ResourceNotFound";

/// Answers inventory queries by running `az vm show`.
#[derive(Clone, Debug)]
pub struct AzureCliOracle<R: CommandRunner> {
    az_bin: String,
    runner: R,
}

impl<R: CommandRunner> AzureCliOracle<R> {
    /// Creates an oracle that invokes `az_bin` through `runner`.
    #[must_use]
    pub fn new(az_bin: impl Into<String>, runner: R) -> Self {
        Self {
            az_bin: az_bin.into(),
            runner,
        }
    }

    /// Selects the cloud and makes sure a CLI session exists.
    ///
    /// Runs `az cloud set`, then `az account show`; when no account is
    /// active, falls back to an interactive `az login`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when selecting the cloud or logging in fails.
    pub fn ensure_session(&self, cloud: &str) -> Result<(), OracleError> {
        let set_cloud = to_args(&["cloud", "set", "--name", cloud]);
        self.run_checked(&set_cloud, "cloud set")?;

        let account = self.runner.run(&self.az_bin, &to_args(&["account", "show"]))?;
        if account.is_success() {
            tracing::debug!(cloud, "Azure CLI session already active");
            return Ok(());
        }

        tracing::info!(cloud, "no active Azure CLI session, logging in");
        self.run_checked(&to_args(&["login"]), "login")?;
        Ok(())
    }

    fn run_checked(&self, args: &[OsString], action: &str) -> Result<CommandOutput, OracleError> {
        let output = self.runner.run(&self.az_bin, args)?;
        if output.is_success() {
            return Ok(output);
        }
        Err(self.command_failure(&output, action))
    }

    fn command_failure(&self, output: &CommandOutput, action: &str) -> OracleError {
        let status_text = output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        OracleError::CommandFailure {
            program: self.az_bin.clone(),
            status: output.code,
            status_text,
            stderr: format!("{action}: {}", output.stderr.trim()),
        }
    }
}

impl<R: CommandRunner> InventoryOracle for AzureCliOracle<R> {
    fn vm_presence(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<VmPresence, OracleError> {
        let mut args = vm_show_args(subscription, resource_group, vm_name);
        args.extend(to_args(&["--output", "none"]));
        let output = self.runner.run(&self.az_bin, &args)?;

        if output.is_success() {
            Ok(VmPresence::Found)
        } else if output.mentions(RESOURCE_GROUP_NOT_FOUND) {
            Ok(VmPresence::ResourceGroupNotFound)
        } else if output.mentions(RESOURCE_NOT_FOUND) {
            Ok(VmPresence::NotFound)
        } else {
            Err(self.command_failure(&output, "vm show"))
        }
    }

    fn private_ips(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Vec<String>, OracleError> {
        let mut args = vm_show_args(subscription, resource_group, vm_name);
        args.extend(to_args(&[
            "--show-details",
            "--query",
            "privateIps",
            "--output",
            "json",
        ]));
        let output = self.run_checked(&args, "vm show --show-details")?;
        parse_private_ips(&output.stdout)
    }
}

fn vm_show_args(subscription: &str, resource_group: &str, vm_name: &str) -> Vec<OsString> {
    to_args(&[
        "vm",
        "show",
        "--name",
        vm_name,
        "--resource-group",
        resource_group,
        "--subscription",
        subscription,
    ])
}

fn to_args(parts: &[&str]) -> Vec<OsString> {
    parts.iter().map(OsString::from).collect()
}

/// `privateIps` is a comma-separated string, or `null` for VMs without a NIC.
fn parse_private_ips(stdout: &str) -> Result<Vec<String>, OracleError> {
    let joined: Option<String> =
        serde_json::from_str(stdout.trim()).map_err(|err| OracleError::Parse {
            query: String::from("privateIps"),
            message: err.to_string(),
        })?;
    Ok(joined
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
        .collect())
}
