//! BDD scenarios for the blueprint audits.

use rstest_bdd_macros::scenario;

use super::test_helpers::{AuditContext, audit_context};

#[scenario(
    path = "tests/features/audit.feature",
    name = "Declared VMs that exist produce a clean report"
)]
fn scenario_clean_existence(audit_context: AuditContext) {
    drop(audit_context);
}

#[scenario(
    path = "tests/features/audit.feature",
    name = "Missing VMs and missing resource groups are told apart"
)]
fn scenario_missing_vm_and_group(audit_context: AuditContext) {
    drop(audit_context);
}

#[scenario(
    path = "tests/features/audit.feature",
    name = "Windows VMs are looked up by their short name"
)]
fn scenario_windows_short_name(audit_context: AuditContext) {
    drop(audit_context);
}

#[scenario(
    path = "tests/features/audit.feature",
    name = "An address count mismatch skips the IP lookups"
)]
fn scenario_count_mismatch(audit_context: AuditContext) {
    drop(audit_context);
}

#[scenario(
    path = "tests/features/audit.feature",
    name = "Swapped IPs are reported with the observed order"
)]
fn scenario_swapped_ips(audit_context: AuditContext) {
    drop(audit_context);
}

#[scenario(
    path = "tests/features/audit.feature",
    name = "An update blueprint without a matching blueprint is an orphan"
)]
fn scenario_orphan_update(audit_context: AuditContext) {
    drop(audit_context);
}

#[scenario(
    path = "tests/features/audit.feature",
    name = "Unanswered queries are reported and the audit carries on"
)]
fn scenario_failed_checks(audit_context: AuditContext) {
    drop(audit_context);
}
