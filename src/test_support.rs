//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;

use tokio::sync::{Mutex, MutexGuard};

use crate::inventory::{
    CommandOutput, CommandRunner, InventoryOracle, OracleError, RunnerError, VmPresence,
};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RunnerError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Kind of query recorded by [`ScriptedOracle`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OracleQuery {
    /// A [`InventoryOracle::vm_presence`] call.
    Presence,
    /// A [`InventoryOracle::private_ips`] call.
    PrivateIps,
}

/// Records a single query made through [`ScriptedOracle`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OracleCall {
    /// Which query was issued.
    pub query: OracleQuery,
    /// Subscription passed to the oracle.
    pub subscription: String,
    /// Resource group passed to the oracle.
    pub resource_group: String,
    /// VM name passed to the oracle.
    pub vm_name: String,
}

/// In-memory inventory keyed by VM name.
///
/// VMs without a scripted presence are reported as found; VMs without
/// scripted IPs report none.
#[derive(Clone, Debug, Default)]
pub struct ScriptedOracle {
    presence: Rc<RefCell<HashMap<String, Result<VmPresence, OracleError>>>>,
    private_ips: Rc<RefCell<HashMap<String, Result<Vec<String>, OracleError>>>>,
    calls: Rc<RefCell<Vec<OracleCall>>>,
}

impl ScriptedOracle {
    /// Creates an oracle in which every VM exists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the presence answer for `vm_name`.
    pub fn set_presence(&self, vm_name: &str, presence: VmPresence) {
        self.presence
            .borrow_mut()
            .insert(vm_name.to_owned(), Ok(presence));
    }

    /// Scripts the private IPs reported for `vm_name`.
    pub fn set_private_ips(&self, vm_name: &str, ips: &[&str]) {
        self.private_ips.borrow_mut().insert(
            vm_name.to_owned(),
            Ok(ips.iter().map(|ip| (*ip).to_owned()).collect()),
        );
    }

    /// Makes every query about `vm_name` fail with `message`.
    pub fn fail_queries(&self, vm_name: &str, message: &str) {
        let error = OracleError::CommandFailure {
            program: String::from("az"),
            status: Some(1),
            status_text: String::from("1"),
            stderr: message.to_owned(),
        };
        self.presence
            .borrow_mut()
            .insert(vm_name.to_owned(), Err(error.clone()));
        self.private_ips
            .borrow_mut()
            .insert(vm_name.to_owned(), Err(error));
    }

    /// Returns a snapshot of all queries recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<OracleCall> {
        self.calls.borrow().clone()
    }

    /// Counts the recorded queries of one kind.
    #[must_use]
    pub fn count(&self, query: OracleQuery) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.query == query)
            .count()
    }

    fn record(&self, query: OracleQuery, subscription: &str, resource_group: &str, vm_name: &str) {
        self.calls.borrow_mut().push(OracleCall {
            query,
            subscription: subscription.to_owned(),
            resource_group: resource_group.to_owned(),
            vm_name: vm_name.to_owned(),
        });
    }
}

impl InventoryOracle for ScriptedOracle {
    fn vm_presence(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<VmPresence, OracleError> {
        self.record(OracleQuery::Presence, subscription, resource_group, vm_name);
        self.presence
            .borrow()
            .get(vm_name)
            .cloned()
            .unwrap_or(Ok(VmPresence::Found))
    }

    fn private_ips(
        &self,
        subscription: &str,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Vec<String>, OracleError> {
        self.record(OracleQuery::PrivateIps, subscription, resource_group, vm_name);
        self.private_ips
            .borrow()
            .get(vm_name)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
