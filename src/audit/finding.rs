//! Reconciliation discrepancies.

use std::fmt;

use camino::Utf8PathBuf;

/// Discriminant of a [`Finding`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FindingKind {
    /// The resource group of a declared VM does not exist.
    MissingResourceGroup,
    /// The resource group exists but the declared VM does not.
    MissingVm,
    /// The VM does not hold its declared IP.
    IpMismatch,
    /// A network declares a different number of addresses than VMs.
    IpCountMismatch,
    /// An update blueprint references no matching base blueprint.
    OrphanUpdateBlueprint,
    /// The inventory could not answer a query.
    CheckFailed,
}

/// Which inventory query failed for a [`Finding::CheckFailed`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CheckKind {
    /// VM existence lookup.
    Existence,
    /// Private IP lookup.
    PrivateIp,
}

/// The blueprint file a finding points at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Origin {
    /// PBN of the document.
    pub pbn: String,
    /// File the document was loaded from.
    pub path: Utf8PathBuf,
}

/// One discrepancy between declared and observed infrastructure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Finding {
    /// See [`FindingKind::MissingResourceGroup`].
    MissingResourceGroup {
        /// Offending blueprint.
        origin: Origin,
        /// Derived resource group name.
        resource_group: String,
        /// VM that was being looked up.
        vm_name: String,
    },
    /// See [`FindingKind::MissingVm`].
    MissingVm {
        /// Offending blueprint.
        origin: Origin,
        /// Derived resource group name.
        resource_group: String,
        /// Derived VM name.
        vm_name: String,
    },
    /// See [`FindingKind::IpMismatch`].
    IpMismatch {
        /// Offending blueprint.
        origin: Origin,
        /// Derived VM name.
        vm_name: String,
        /// Address declared for this ordinal.
        declared_ip: String,
        /// Addresses reported by the inventory.
        observed_ips: Vec<String>,
    },
    /// See [`FindingKind::IpCountMismatch`].
    IpCountMismatch {
        /// Offending blueprint.
        origin: Origin,
        /// Placement-qualified VM group label.
        vm_group: String,
        /// Number of declared addresses.
        addresses: usize,
        /// Declared instance count.
        count: u32,
    },
    /// See [`FindingKind::OrphanUpdateBlueprint`].
    OrphanUpdateBlueprint {
        /// The update blueprint.
        origin: Origin,
        /// PBN it references.
        reference: String,
        /// Datacenter of the entry being audited.
        datacenter: String,
        /// Environment of the entry being audited.
        environment: String,
    },
    /// See [`FindingKind::CheckFailed`].
    CheckFailed {
        /// Blueprint whose VM could not be checked.
        origin: Origin,
        /// Query that failed.
        check: CheckKind,
        /// Derived resource group name.
        resource_group: String,
        /// Derived VM name.
        vm_name: String,
        /// Error reported by the inventory.
        message: String,
    },
}

impl Finding {
    /// Returns the finding's discriminant.
    #[must_use]
    pub const fn kind(&self) -> FindingKind {
        match self {
            Self::MissingResourceGroup { .. } => FindingKind::MissingResourceGroup,
            Self::MissingVm { .. } => FindingKind::MissingVm,
            Self::IpMismatch { .. } => FindingKind::IpMismatch,
            Self::IpCountMismatch { .. } => FindingKind::IpCountMismatch,
            Self::OrphanUpdateBlueprint { .. } => FindingKind::OrphanUpdateBlueprint,
            Self::CheckFailed { .. } => FindingKind::CheckFailed,
        }
    }

    /// Returns the blueprint the finding points at.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        match self {
            Self::MissingResourceGroup { origin, .. }
            | Self::MissingVm { origin, .. }
            | Self::IpMismatch { origin, .. }
            | Self::IpCountMismatch { origin, .. }
            | Self::OrphanUpdateBlueprint { origin, .. }
            | Self::CheckFailed { origin, .. } => origin,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingResourceGroup {
                origin,
                resource_group,
                vm_name,
            } => write!(
                f,
                "Resource Group {resource_group} not found while looking for VM {vm_name}. \
                 Check for cleanup blueprint {} in file {}",
                origin.pbn, origin.path
            ),
            Self::MissingVm {
                origin,
                resource_group,
                vm_name,
            } => write!(
                f,
                "Resource Group {resource_group} exists but VM {vm_name} doesn't. \
                 Check for cleanup RG and blueprint {} in {}",
                origin.pbn, origin.path
            ),
            Self::IpMismatch {
                origin,
                vm_name,
                declared_ip,
                observed_ips,
            } => write!(
                f,
                "IP for vm {vm_name} does not match (declared {declared_ip}, found [{}]). \
                 Check for cleanup blueprint {} in file {}",
                observed_ips.join(", "),
                origin.pbn,
                origin.path
            ),
            Self::IpCountMismatch {
                origin,
                vm_group,
                addresses,
                count,
            } => write!(
                f,
                "Number of IP addresses ({addresses}) and count ({count}) do not match for \
                 {vm_group} in file {}",
                origin.path
            ),
            Self::OrphanUpdateBlueprint {
                origin,
                reference,
                datacenter,
                environment,
            } => write!(
                f,
                "Update blueprint {}-{datacenter}-{environment} does not have a matching \
                 blueprint {reference} (file {})",
                origin.pbn, origin.path
            ),
            Self::CheckFailed {
                origin,
                check,
                resource_group,
                vm_name,
                message,
            } => {
                let subject = match check {
                    CheckKind::Existence => "Existence",
                    CheckKind::PrivateIp => "IP",
                };
                write!(
                    f,
                    "{subject} for vm {vm_name} in Resource Group {resource_group} could not \
                     be checked: {message}. Check blueprint {} in file {}",
                    origin.pbn, origin.path
                )
            }
        }
    }
}
