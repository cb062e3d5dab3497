//! BDD step definitions for the blueprint audits.

use bpaudit::report::CleanupItem;
use bpaudit::test_support::OracleQuery;
use bpaudit::{Auditor, FindingKind, VmPresence};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{AuditContext, SUBSCRIPTION, blueprint_yaml, load};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("an audit of datacenter \"{datacenter}\" and environment \"{environment}\"")]
fn audit_of_placement(
    mut audit_context: AuditContext,
    datacenter: String,
    environment: String,
) -> AuditContext {
    audit_context.selection.datacenter = datacenter;
    audit_context.selection.environment = environment;
    audit_context
}

#[given(
    "a blueprint \"{name}\" declaring {count:u32} \"{os}\" VMs named \"{vm}\" with addresses \"{addresses}\""
)]
fn blueprint_declaring(
    mut audit_context: AuditContext,
    name: String,
    count: u32,
    os: String,
    vm: String,
    addresses: String,
) -> AuditContext {
    let vm_fields = format!(
        "name: {vm}\n        count: {count}\n        os: {os}\n        networks:\n          \
         - address: [{addresses}]"
    );
    let source = blueprint_yaml(&audit_context.selection, &name, &vm_fields);
    audit_context.blueprints.push(load(&name, &source));
    audit_context
}

#[given("an update blueprint \"{name}\" referencing \"{reference}\"")]
fn update_blueprint_referencing(
    mut audit_context: AuditContext,
    name: String,
    reference: String,
) -> AuditContext {
    let vm_fields = format!("name: api\n        infrastructure_blueprint: {reference}");
    let source = blueprint_yaml(&audit_context.selection, &name, &vm_fields);
    audit_context.updates.push(load(&name, &source));
    audit_context
}

#[given("the inventory has no resource group for VM \"{vm}\"")]
fn inventory_without_group(audit_context: AuditContext, vm: String) -> AuditContext {
    audit_context
        .oracle
        .set_presence(&vm, VmPresence::ResourceGroupNotFound);
    audit_context
}

#[given("the inventory has no VM \"{vm}\"")]
fn inventory_without_vm(audit_context: AuditContext, vm: String) -> AuditContext {
    audit_context.oracle.set_presence(&vm, VmPresence::NotFound);
    audit_context
}

#[given("the inventory reports IP \"{ip}\" for VM \"{vm}\"")]
fn inventory_reports_ip(audit_context: AuditContext, ip: String, vm: String) -> AuditContext {
    audit_context.oracle.set_private_ips(&vm, &[ip.as_str()]);
    audit_context
}

#[given("the inventory cannot answer for VM \"{vm}\"")]
fn inventory_fails(audit_context: AuditContext, vm: String) -> AuditContext {
    audit_context.oracle.fail_queries(&vm, "service unavailable");
    audit_context
}

fn auditor(audit_context: &AuditContext) -> Auditor<bpaudit::test_support::ScriptedOracle> {
    Auditor::new(
        SUBSCRIPTION,
        audit_context.selection.clone(),
        audit_context.oracle.clone(),
    )
}

#[when("I audit VM existence")]
fn audit_existence(mut audit_context: AuditContext) -> AuditContext {
    let report = auditor(&audit_context).audit_vm_existence(&audit_context.blueprint_corpus());
    audit_context.report = Some(report);
    audit_context
}

#[when("I audit VM IPs")]
fn audit_ips(mut audit_context: AuditContext) -> AuditContext {
    let report = auditor(&audit_context).audit_vm_ips(&audit_context.blueprint_corpus());
    audit_context.report = Some(report);
    audit_context
}

#[when("I audit update blueprints")]
fn audit_updates(mut audit_context: AuditContext) -> AuditContext {
    let report = auditor(&audit_context).audit_update_blueprints(
        &audit_context.blueprint_corpus(),
        &audit_context.update_corpus(),
    );
    audit_context.report = Some(report);
    audit_context
}

fn report(audit_context: &AuditContext) -> Result<&bpaudit::AuditReport, StepError> {
    audit_context
        .report
        .as_ref()
        .ok_or_else(|| StepError::Assertion(String::from("missing report")))
}

#[then("the report is clean")]
fn report_is_clean(audit_context: &AuditContext) -> Result<(), StepError> {
    let report = report(audit_context)?;
    if report.is_clean() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a clean report, got:{}",
            report.render()
        )))
    }
}

#[then("the report lists {count:usize} \"{kind}\" findings")]
fn report_lists(audit_context: &AuditContext, count: usize, kind: String) -> Result<(), StepError> {
    let expected = parse_kind(&kind)?;
    let report = report(audit_context)?;
    let found = report
        .findings()
        .filter(|finding| finding.kind() == expected)
        .count();
    if found == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} {kind} findings, got {found}:{}",
            report.render()
        )))
    }
}

#[then("the report suggests the IP order \"{order}\"")]
fn report_suggests_order(audit_context: &AuditContext, order: String) -> Result<(), StepError> {
    let report = report(audit_context)?;
    let expected = order.split(',').collect::<Vec<_>>();
    let hint = report
        .items()
        .iter()
        .find_map(|item| match item {
            CleanupItem::IpOrder(hint) => Some(hint),
            CleanupItem::Finding(_) => None,
        })
        .ok_or_else(|| StepError::Assertion(String::from("missing IP order hint")))?;
    if hint.observed == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected IP order {expected:?}, got {:?}",
            hint.observed
        )))
    }
}

#[then("the inventory received {count:usize} IP queries")]
fn ip_queries(audit_context: &AuditContext, count: usize) -> Result<(), StepError> {
    expect_queries(audit_context, OracleQuery::PrivateIps, count)
}

#[then("the inventory received {count:usize} presence queries")]
fn presence_queries(audit_context: &AuditContext, count: usize) -> Result<(), StepError> {
    expect_queries(audit_context, OracleQuery::Presence, count)
}

fn expect_queries(
    audit_context: &AuditContext,
    query: OracleQuery,
    count: usize,
) -> Result<(), StepError> {
    let issued = audit_context.oracle.count(query);
    if issued == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} {query:?} queries, got {issued}"
        )))
    }
}

fn parse_kind(kind: &str) -> Result<FindingKind, StepError> {
    match kind {
        "missing resource group" => Ok(FindingKind::MissingResourceGroup),
        "missing vm" => Ok(FindingKind::MissingVm),
        "ip mismatch" => Ok(FindingKind::IpMismatch),
        "ip count mismatch" => Ok(FindingKind::IpCountMismatch),
        "orphan update blueprint" => Ok(FindingKind::OrphanUpdateBlueprint),
        "check failed" => Ok(FindingKind::CheckFailed),
        _ => Err(StepError::Assertion(format!("unknown finding kind: {kind}"))),
    }
}
