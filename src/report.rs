//! Cleanup reports and the run's exit status.
//!
//! Each audit produces one [`AuditReport`]: an ordered list of findings and
//! IP-order hints, rendered once at the end as a banner section.

use std::fmt;
use std::io::{self, Write};

use crate::audit::{Finding, FindingKind};

const RULE: &str = "#############################";

/// The reconciliation an [`AuditReport`] belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuditKind {
    /// Update blueprints cross-referenced against blueprints.
    UpdateBlueprints,
    /// Declared VMs checked for existence.
    Blueprints,
    /// Declared VM addresses checked against assigned private IPs.
    BlueprintIps,
}

impl AuditKind {
    /// Banner title of the audit.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::UpdateBlueprints => "Update Blueprints",
            Self::Blueprints => "Blueprints",
            Self::BlueprintIps => "Blueprint IPs",
        }
    }
}

/// Observed IP order of a VM group whose addresses did not all match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IpOrderHint {
    /// PBN of the blueprint.
    pub pbn: String,
    /// Datacenter of the audited entry.
    pub datacenter: String,
    /// Environment of the audited entry.
    pub environment: String,
    /// Addresses reported per instance, in ordinal order.
    pub observed: Vec<String>,
}

impl fmt::Display for IpOrderHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Correct IP order for blueprint {} in the dc-env {}-{} is:",
            self.pbn, self.datacenter, self.environment
        )?;
        for ip in &self.observed {
            write!(f, "\n- {ip}")?;
        }
        Ok(())
    }
}

/// One line item of a cleanup report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CleanupItem {
    /// A discrepancy.
    Finding(Finding),
    /// Guidance following IP mismatches.
    IpOrder(IpOrderHint),
}

impl fmt::Display for CleanupItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finding(finding) => finding.fmt(f),
            Self::IpOrder(hint) => hint.fmt(f),
        }
    }
}

/// Ordered outcome of one audit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditReport {
    kind: AuditKind,
    datacenter: String,
    environment: String,
    items: Vec<CleanupItem>,
    warnings: Vec<String>,
}

impl AuditReport {
    /// Starts an empty report for the given audit and placement.
    #[must_use]
    pub fn new(
        kind: AuditKind,
        datacenter: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            datacenter: datacenter.into(),
            environment: environment.into(),
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Appends a finding.
    pub fn push_finding(&mut self, finding: Finding) {
        self.items.push(CleanupItem::Finding(finding));
    }

    /// Appends an IP-order hint.
    pub fn push_hint(&mut self, hint: IpOrderHint) {
        self.items.push(CleanupItem::IpOrder(hint));
    }

    /// Records a warning that does not count as a finding.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// The audit this report belongs to.
    #[must_use]
    pub const fn kind(&self) -> AuditKind {
        self.kind
    }

    /// All items in discovery order.
    #[must_use]
    pub fn items(&self) -> &[CleanupItem] {
        &self.items
    }

    /// Warnings in the order they were raised.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Findings in discovery order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.items.iter().filter_map(|item| match item {
            CleanupItem::Finding(finding) => Some(finding),
            CleanupItem::IpOrder(_) => None,
        })
    }

    /// Returns `true` when the audit found nothing to clean up.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings().next().is_none()
    }

    /// Returns `true` when any inventory query failed.
    #[must_use]
    pub fn has_check_failures(&self) -> bool {
        self.findings()
            .any(|finding| finding.kind() == FindingKind::CheckFailed)
    }

    /// Renders the report banner and its items.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Writes the rendered report to `target`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by `target`.
    pub fn write_to(&self, mut target: impl Write) -> io::Result<()> {
        write!(target, "{self}")
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.kind.title();
        if self.items.is_empty() {
            writeln!(f, "\n\n{RULE}\n# Everything looks clean\n# {title}\n{RULE}")?;
        } else {
            writeln!(
                f,
                "\n\n{RULE}\n# Cleanup suggestions {}-{}\n# {title}\n{RULE}",
                self.datacenter, self.environment
            )?;
            for item in &self.items {
                writeln!(f, "{item}")?;
            }
            writeln!(f, "{RULE}")?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "# Warnings ({title})")?;
            for warning in &self.warnings {
                writeln!(f, "! {warning}")?;
            }
        }
        Ok(())
    }
}

/// Overall outcome of a run, mapped to the process exit code.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum RunStatus {
    /// Nothing to clean up.
    Clean,
    /// At least one finding.
    FindingsPresent,
    /// At least one inventory query failed.
    CheckFailures,
}

impl RunStatus {
    /// Exit code for the status: `0`, `2` or `3`.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::FindingsPresent => 2,
            Self::CheckFailures => 3,
        }
    }

    /// Derives the status of a run from all of its reports.
    #[must_use]
    pub fn from_reports(reports: &[AuditReport]) -> Self {
        reports
            .iter()
            .map(|report| {
                if report.has_check_failures() {
                    Self::CheckFailures
                } else if report.is_clean() {
                    Self::Clean
                } else {
                    Self::FindingsPresent
                }
            })
            .max()
            .unwrap_or(Self::Clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{CheckKind, Origin};
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};

    #[fixture]
    fn origin() -> Origin {
        Origin {
            pbn: String::from("web-prod-app1"),
            path: Utf8PathBuf::from("blueprints/app1.yaml"),
        }
    }

    fn missing_vm(origin: &Origin, vm_name: &str) -> Finding {
        Finding::MissingVm {
            origin: origin.clone(),
            resource_group: String::from("dc1-dev-web-prod-app1"),
            vm_name: vm_name.to_owned(),
        }
    }

    #[rstest]
    fn empty_report_renders_clean_banner() {
        let report = AuditReport::new(AuditKind::Blueprints, "dc1", "dev");
        assert!(report.is_clean());
        assert_eq!(
            report.render(),
            "\n\n#############################\n# Everything looks clean\n# Blueprints\n\
             #############################\n"
        );
    }

    #[rstest]
    fn report_lists_items_in_discovery_order(origin: Origin) {
        let mut report = AuditReport::new(AuditKind::BlueprintIps, "dc1", "dev");
        report.push_finding(missing_vm(&origin, "vm-2"));
        report.push_finding(missing_vm(&origin, "vm-1"));
        report.push_hint(IpOrderHint {
            pbn: origin.pbn.clone(),
            datacenter: String::from("dc1"),
            environment: String::from("dev"),
            observed: vec![String::from("10.0.0.2"), String::from("10.0.0.1")],
        });

        let rendered = report.render();
        let body = rendered
            .lines()
            .filter(|line| !line.starts_with('#') && !line.is_empty())
            .collect::<Vec<_>>();

        assert!(rendered.contains("# Cleanup suggestions dc1-dev\n# Blueprint IPs\n"));
        assert_eq!(body.len(), 5, "unexpected body: {body:?}");
        assert!(body.first().is_some_and(|line| line.contains("VM vm-2 doesn't")));
        assert!(body.get(1).is_some_and(|line| line.contains("VM vm-1 doesn't")));
        assert_eq!(
            body.get(2..),
            Some(
                &[
                    "Correct IP order for blueprint web-prod-app1 in the dc-env dc1-dev is:",
                    "- 10.0.0.2",
                    "- 10.0.0.1",
                ][..]
            )
        );
        assert!(rendered.ends_with("#############################\n"));
    }

    #[rstest]
    fn duplicate_findings_are_kept(origin: Origin) {
        let mut report = AuditReport::new(AuditKind::Blueprints, "dc1", "dev");
        report.push_finding(missing_vm(&origin, "vm-1"));
        report.push_finding(missing_vm(&origin, "vm-1"));
        assert_eq!(report.findings().count(), 2);
    }

    #[rstest]
    fn warnings_do_not_make_a_report_dirty() {
        let mut report = AuditReport::new(AuditKind::UpdateBlueprints, "dc1", "dev");
        report.warn("duplicate blueprint web-prod-app1");
        assert!(report.is_clean());
        assert!(
            report
                .render()
                .ends_with("# Warnings (Update Blueprints)\n! duplicate blueprint web-prod-app1\n")
        );
    }

    #[rstest]
    fn run_status_prefers_check_failures(origin: Origin) {
        let clean = AuditReport::new(AuditKind::UpdateBlueprints, "dc1", "dev");
        let mut dirty = AuditReport::new(AuditKind::Blueprints, "dc1", "dev");
        dirty.push_finding(missing_vm(&origin, "vm-1"));
        let mut failed = AuditReport::new(AuditKind::BlueprintIps, "dc1", "dev");
        failed.push_finding(Finding::CheckFailed {
            origin,
            check: CheckKind::PrivateIp,
            resource_group: String::from("rg"),
            vm_name: String::from("vm-1"),
            message: String::from("throttled"),
        });

        assert_eq!(RunStatus::from_reports(&[]), RunStatus::Clean);
        assert_eq!(RunStatus::from_reports(&[clean.clone()]).exit_code(), 0);
        assert_eq!(
            RunStatus::from_reports(&[clean.clone(), dirty.clone()]).exit_code(),
            2
        );
        assert_eq!(RunStatus::from_reports(&[failed, dirty, clean]).exit_code(), 3);
    }
}
