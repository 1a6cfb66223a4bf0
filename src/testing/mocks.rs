//! Test doubles for the process and DNS seams.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::security::{CommandError, CommandExecutor, HostResolver};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

/// An executor that records calls and replays scripted results.
///
/// Results are consumed in order; once the script runs out every call
/// succeeds with empty output.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<RecordedCall>>,
    script: Mutex<VecDeque<Result<Vec<u8>, CommandError>>>,
}

impl RecordingExecutor {
    /// Creates an executor where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful result with the given output.
    #[must_use]
    pub fn then_succeed(self, output: &str) -> Self {
        lock(&self.script).push_back(Ok(output.as_bytes().to_vec()));
        self
    }

    /// Queues a non-zero exit with the given combined output.
    #[must_use]
    pub fn then_fail(self, output: &str) -> Self {
        lock(&self.script).push_back(Err(CommandError::ExitFailure {
            status: "exit status: 1".to_string(),
            output: output.as_bytes().to_vec(),
        }));
        self
    }

    /// Queues an arbitrary error.
    #[must_use]
    pub fn then_error(self, error: CommandError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Returns every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Returns the number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CommandError> {
        lock(&self.calls).push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
        });
        lock(&self.script).pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A resolver backed by a fixed host table.
///
/// IP literals resolve to themselves; unknown names fail with `NotFound`.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `host` to the given addresses. Panics on malformed addresses.
    #[must_use]
    pub fn with_host(mut self, host: &str, addrs: &[&str]) -> Self {
        let parsed = addrs
            .iter()
            .map(|a| a.parse().expect("valid IP address in test fixture"))
            .collect();
        self.hosts.insert(host.to_string(), parsed);
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        self.hosts.get(host).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such host: {}", host),
            )
        })
    }
}
