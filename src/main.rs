//! Binary entry point for the `bpaudit` CLI.

use std::io::{self, Write};
use std::process;
use std::slice;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use bpaudit::{
    AuditConfig, AuditReport, Auditor, AzureCliOracle, ConfigError, Corpus, CorpusError,
    InventoryOracle, OracleError, ProcessCommandRunner, RunStatus,
};

mod cli;

use cli::{AuditScope, Cli};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("cloud login failed: {0}")]
    Login(OracleError),
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let exit_code = match execute(&cli) {
        Ok(status) => status.exit_code(),
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn execute(cli: &Cli) -> Result<RunStatus, CliError> {
    let config = load_config(cli.config.as_deref())?;
    let oracle = AzureCliOracle::new(config.az_bin.as_str(), ProcessCommandRunner);
    if cli.skip_login {
        tracing::info!("skipping cloud selection and login");
    } else {
        oracle
            .ensure_session(&config.cloud)
            .map_err(CliError::Login)?;
    }

    run_audits(&config, cli.scope, oracle, io::stdout().lock())
}

fn load_config(path: Option<&Utf8Path>) -> Result<AuditConfig, ConfigError> {
    let config = path.map_or_else(
        AuditConfig::load_without_cli_args,
        AuditConfig::from_legacy_yaml,
    )?;
    config.validate()?;
    Ok(config)
}

/// Runs the audits selected by `scope`, writing each report to `out` as soon
/// as it is complete.
fn run_audits<O: InventoryOracle>(
    config: &AuditConfig,
    scope: AuditScope,
    oracle: O,
    mut out: impl Write,
) -> Result<RunStatus, CliError> {
    let auditor = Auditor::new(config.subscription.as_str(), config.selection(), oracle);
    let blueprints = Corpus::load(&config.blueprints_root())?;

    let mut status = RunStatus::Clean;
    let mut emit = |report: AuditReport| -> Result<(), CliError> {
        report.write_to(&mut out)?;
        status = status.max(RunStatus::from_reports(slice::from_ref(&report)));
        Ok(())
    };

    if scope.audits_update_blueprints() {
        let updates = Corpus::load(&config.update_blueprints_root())?;
        emit(auditor.audit_update_blueprints(&blueprints, &updates))?;
    }
    if scope.audits_existence() {
        emit(auditor.audit_vm_existence(&blueprints))?;
    }
    if scope.audits_ips() {
        emit(auditor.audit_vm_ips(&blueprints))?;
    }
    out.flush()?;
    Ok(status)
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
