//! Reconciliation of declared blueprints against the live inventory.
//!
//! All three audits walk the same skeleton: in-scope documents, then the
//! environment entries for the selected placement, then their VM
//! declarations. The walk is strictly sequential and issues one inventory
//! query at a time. A failed query becomes a [`Finding::CheckFailed`] and the
//! walk carries on; an audit never aborts part way.

mod finding;

use crate::blueprint::{DeclaredVm, NetworkSpec, Selection, VmSpec};
use crate::corpus::{Corpus, LoadedDocument};
use crate::inventory::{InventoryOracle, VmPresence};
use crate::naming::Placement;
use crate::report::{AuditKind, AuditReport, IpOrderHint};

pub use finding::{CheckKind, Finding, FindingKind, Origin};

/// One VM declaration reached by the traversal.
struct VmSite<'c> {
    source: &'c LoadedDocument,
    placement: Placement<'c>,
    vm: &'c VmSpec,
}

impl VmSite<'_> {
    fn origin(&self) -> Origin {
        Origin {
            pbn: self.source.document.pbn(),
            path: self.source.path.clone(),
        }
    }

    fn resource_group(&self) -> String {
        self.placement
            .resource_group(&self.source.document.identity.name)
    }
}

/// Runs the reconciliation audits for one subscription and selection.
#[derive(Clone, Debug)]
pub struct Auditor<O: InventoryOracle> {
    subscription: String,
    selection: Selection,
    oracle: O,
}

impl<O: InventoryOracle> Auditor<O> {
    /// Creates an auditor querying `oracle` within `subscription`.
    #[must_use]
    pub fn new(subscription: impl Into<String>, selection: Selection, oracle: O) -> Self {
        Self {
            subscription: subscription.into(),
            selection,
            oracle,
        }
    }

    /// Checks that every declared VM instance exists.
    #[must_use]
    pub fn audit_vm_existence(&self, blueprints: &Corpus) -> AuditReport {
        let mut report = self.new_report(AuditKind::Blueprints);
        for site in self.vm_sites(blueprints) {
            let Some(declared) = site.vm.declared() else {
                continue;
            };
            let resource_group = site.resource_group();
            for ordinal in 1..=declared.count {
                let vm_name = site
                    .placement
                    .vm_name(declared.name, ordinal, declared.os_family);
                self.check_existence(&site, &resource_group, vm_name, &mut report);
            }
        }
        report
    }

    /// Checks that every declared VM holds its declared private IP.
    #[must_use]
    pub fn audit_vm_ips(&self, blueprints: &Corpus) -> AuditReport {
        let mut report = self.new_report(AuditKind::BlueprintIps);
        for site in self.vm_sites(blueprints) {
            let Some(declared) = site.vm.declared() else {
                continue;
            };
            for network in &site.vm.networks {
                self.check_network(&site, declared, network, &mut report);
            }
        }
        report
    }

    /// Checks that every update blueprint references a base blueprint that
    /// is in scope and placed in the same datacenter and environment.
    ///
    /// Duplicate base PBNs are reported as warnings; any base document with
    /// the referenced PBN that satisfies the selection counts as a match.
    #[must_use]
    pub fn audit_update_blueprints(&self, blueprints: &Corpus, updates: &Corpus) -> AuditReport {
        let mut report = self.new_report(AuditKind::UpdateBlueprints);
        for (pbn, paths) in blueprints.duplicate_pbns() {
            let files = paths
                .iter()
                .map(|path| path.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(%pbn, %files, "blueprint PBN declared more than once");
            report.warn(format!("blueprint {pbn} is declared by several files: {files}"));
        }

        for source in self.in_scope(updates) {
            let pbn = source.document.pbn();
            for entry in self.selection.environments(&source.document) {
                let references = entry
                    .virtual_machines
                    .iter()
                    .filter_map(|vm| vm.infrastructure_blueprint.as_deref());
                for reference in references {
                    if self.has_matching_blueprint(blueprints, reference) {
                        tracing::info!(
                            update_blueprint = %pbn,
                            %reference,
                            "update blueprint has a matching blueprint"
                        );
                        continue;
                    }
                    tracing::warn!(
                        update_blueprint = %pbn,
                        %reference,
                        "update blueprint does not have a matching blueprint"
                    );
                    report.push_finding(Finding::OrphanUpdateBlueprint {
                        origin: Origin {
                            pbn: pbn.clone(),
                            path: source.path.clone(),
                        },
                        reference: reference.to_owned(),
                        datacenter: self.selection.datacenter.clone(),
                        environment: self.selection.environment.clone(),
                    });
                }
            }
        }
        report
    }

    fn new_report(&self, kind: AuditKind) -> AuditReport {
        AuditReport::new(
            kind,
            self.selection.datacenter.as_str(),
            self.selection.environment.as_str(),
        )
    }

    fn in_scope<'c>(&'c self, corpus: &'c Corpus) -> impl Iterator<Item = &'c LoadedDocument> {
        corpus
            .documents()
            .iter()
            .filter(|source| self.selection.includes(&source.document))
    }

    fn vm_sites<'c>(&'c self, corpus: &'c Corpus) -> impl Iterator<Item = VmSite<'c>> {
        self.in_scope(corpus).flat_map(move |source| {
            let identity = &source.document.identity;
            let placement = Placement {
                datacenter: &self.selection.datacenter,
                environment: &self.selection.environment,
                platform: &identity.platform,
                boundary: &identity.boundary,
            };
            self.selection
                .environments(&source.document)
                .flat_map(|entry| entry.virtual_machines.iter())
                .map(move |vm| VmSite {
                    source,
                    placement,
                    vm,
                })
        })
    }

    fn has_matching_blueprint(&self, blueprints: &Corpus, reference: &str) -> bool {
        blueprints.documents().iter().any(|base| {
            base.document.identity.matches_pbn(reference) && self.selection.covers(&base.document)
        })
    }

    fn check_existence(
        &self,
        site: &VmSite<'_>,
        resource_group: &str,
        vm_name: String,
        report: &mut AuditReport,
    ) {
        let file = &site.source.path;
        tracing::info!(%file, vm = %vm_name, "blueprint declares VM");
        match self
            .oracle
            .vm_presence(&self.subscription, resource_group, &vm_name)
        {
            Ok(VmPresence::Found) => {
                tracing::info!(vm = %vm_name, "virtual machine exists");
            }
            Ok(VmPresence::NotFound) => {
                tracing::warn!(vm = %vm_name, %resource_group, "virtual machine does not exist");
                report.push_finding(Finding::MissingVm {
                    origin: site.origin(),
                    resource_group: resource_group.to_owned(),
                    vm_name,
                });
            }
            Ok(VmPresence::ResourceGroupNotFound) => {
                tracing::warn!(vm = %vm_name, %resource_group, "resource group not found");
                report.push_finding(Finding::MissingResourceGroup {
                    origin: site.origin(),
                    resource_group: resource_group.to_owned(),
                    vm_name,
                });
            }
            Err(err) => {
                tracing::warn!(vm = %vm_name, error = %err, "existence check failed");
                report.push_finding(Finding::CheckFailed {
                    origin: site.origin(),
                    check: CheckKind::Existence,
                    resource_group: resource_group.to_owned(),
                    vm_name,
                    message: err.to_string(),
                });
            }
        }
    }

    fn check_network(
        &self,
        site: &VmSite<'_>,
        declared: DeclaredVm<'_>,
        network: &NetworkSpec,
        report: &mut AuditReport,
    ) {
        let vm_group = site.placement.vm_group_label(declared.name);
        if u32::try_from(network.addresses.len()).ok() != Some(declared.count) {
            tracing::warn!(%vm_group, "number of IP addresses and count do not match");
            report.push_finding(Finding::IpCountMismatch {
                origin: site.origin(),
                vm_group,
                addresses: network.addresses.len(),
                count: declared.count,
            });
            return;
        }
        tracing::info!(%vm_group, "number of IP addresses and count match");

        let resource_group = site.resource_group();
        let mut observed_order = Vec::new();
        let mut mismatched = false;
        for (ordinal, declared_ip) in (1..=declared.count).zip(&network.addresses) {
            let vm_name = site
                .placement
                .vm_name(declared.name, ordinal, declared.os_family);
            match self
                .oracle
                .private_ips(&self.subscription, &resource_group, &vm_name)
            {
                Ok(observed_ips) => {
                    if !observed_ips.is_empty() {
                        observed_order.push(observed_ips.join(","));
                    }
                    if observed_ips.iter().any(|ip| ip.contains(declared_ip.as_str())) {
                        tracing::info!(vm = %vm_name, "virtual machine has the declared IP");
                    } else {
                        tracing::warn!(vm = %vm_name, %declared_ip, "IP does not match");
                        mismatched = true;
                        report.push_finding(Finding::IpMismatch {
                            origin: site.origin(),
                            vm_name,
                            declared_ip: declared_ip.clone(),
                            observed_ips,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(vm = %vm_name, error = %err, "IP check failed");
                    report.push_finding(Finding::CheckFailed {
                        origin: site.origin(),
                        check: CheckKind::PrivateIp,
                        resource_group: resource_group.clone(),
                        vm_name,
                        message: err.to_string(),
                    });
                }
            }
        }

        if mismatched && !observed_order.is_empty() {
            report.push_hint(IpOrderHint {
                pbn: site.source.document.pbn(),
                datacenter: site.placement.datacenter.to_owned(),
                environment: site.placement.environment.to_owned(),
                observed: observed_order,
            });
        }
    }
}
