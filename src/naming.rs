//! Canonical resource-group and VM instance names.
//!
//! Linux hosts carry their full placement in the name
//! (`<dc>-<env>-<platform>-<boundary>-<base>-<ordinal>`). Windows hosts are
//! limited to short computer names, so they are named `<base>-<ordinal>` and
//! rely on the resource group for placement.

use crate::blueprint::OsFamily;

/// Returns `"{datacenter}-{environment}-{platform}-{boundary}-{blueprint_name}"`.
#[must_use]
pub fn resource_group_name(
    datacenter: &str,
    environment: &str,
    platform: &str,
    boundary: &str,
    blueprint_name: &str,
) -> String {
    format!("{datacenter}-{environment}-{platform}-{boundary}-{blueprint_name}")
}

/// Returns the name of the `ordinal`-th (1-based) instance of a VM group.
#[must_use]
pub fn vm_instance_name(
    datacenter: &str,
    environment: &str,
    platform: &str,
    boundary: &str,
    vm_base_name: &str,
    ordinal: u32,
    os_family: OsFamily,
) -> String {
    match os_family {
        OsFamily::Windows => format!("{vm_base_name}-{ordinal}"),
        OsFamily::Linux => {
            format!("{datacenter}-{environment}-{platform}-{boundary}-{vm_base_name}-{ordinal}")
        }
    }
}

/// Where a blueprint's VMs live: datacenter, environment, platform and
/// boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Placement<'a> {
    /// Datacenter label.
    pub datacenter: &'a str,
    /// Environment label.
    pub environment: &'a str,
    /// Blueprint platform.
    pub platform: &'a str,
    /// Blueprint boundary.
    pub boundary: &'a str,
}

impl Placement<'_> {
    /// Resource group holding the named blueprint in this placement.
    #[must_use]
    pub fn resource_group(&self, blueprint_name: &str) -> String {
        resource_group_name(
            self.datacenter,
            self.environment,
            self.platform,
            self.boundary,
            blueprint_name,
        )
    }

    /// Instance name of a VM in this placement.
    #[must_use]
    pub fn vm_name(&self, vm_base_name: &str, ordinal: u32, os_family: OsFamily) -> String {
        vm_instance_name(
            self.datacenter,
            self.environment,
            self.platform,
            self.boundary,
            vm_base_name,
            ordinal,
            os_family,
        )
    }

    /// Placement-qualified label of a VM group, used in count mismatches.
    #[must_use]
    pub fn vm_group_label(&self, vm_base_name: &str) -> String {
        format!(
            "{}-{}-{}-{}-{vm_base_name}",
            self.datacenter, self.environment, self.platform, self.boundary
        )
    }
}
