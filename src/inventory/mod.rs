//! Live cloud inventory queries.
//!
//! The auditor only needs two answers from the cloud: whether a VM exists in
//! a resource group, and which private IPs it holds. [`InventoryOracle`] is
//! the seam; [`AzureCliOracle`] answers it by shelling out to `az`.

mod azure;
pub mod runner;

use thiserror::Error;

pub use azure::{AzureCliOracle, DEFAULT_AZ_BIN};
pub use runner::{CommandOutput, CommandRunner, ProcessCommandRunner, RunnerError};

/// Whether a VM could be found.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VmPresence {
    /// The VM exists in the resource group.
    Found,
    /// The resource group exists but the VM does not.
    NotFound,
    /// The resource group itself does not exist.
    ResourceGroupNotFound,
}

/// Errors raised by inventory queries.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OracleError {
    /// Raised when the cloud CLI returns a non-zero exit status.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `az`).
        program: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when CLI output cannot be parsed.
    #[error("failed to parse {query} output: {message}")]
    Parse {
        /// Query whose output was malformed.
        query: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when command execution fails.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Read-only view of the live cloud inventory.
pub trait InventoryOracle {
    /// Reports whether `vm_name` exists in `resource_group`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the query cannot be answered.
    fn vm_presence(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<VmPresence, OracleError>;

    /// Returns the private IPs currently assigned to `vm_name`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the query cannot be answered.
    fn private_ips(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Vec<String>, OracleError>;
}

impl<O: InventoryOracle + ?Sized> InventoryOracle for &O {
    fn vm_presence(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<VmPresence, OracleError> {
        (**self).vm_presence(subscription, resource_group, vm_name)
    }

    fn private_ips(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Vec<String>, OracleError> {
        (**self).private_ips(subscription, resource_group, vm_name)
    }
}
