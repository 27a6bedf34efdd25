//! Forced termination of the monitored processes after sustained idle upload.
//!
//! Entered from the monitor loop when a traffic sample was low. While any
//! monitored process runs, one-second traffic samples are counted; a run of
//! `run_length` consecutive low samples triggers a privileged kill of every
//! monitored process.

use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::IdleKillConfig;
use crate::error::TerminationError;
use crate::sampler::Sampler;

/// Best-effort termination of a process by executable name.
pub trait Terminator {
    fn kill(&mut self, name: &str) -> Result<(), TerminationError>;
}

/// Spawns the configured command with the process name appended,
/// e.g. `Nsudo -U:S -ShowWindowMode:Hide taskkill /f /im screenCapture.exe`.
pub struct CommandTerminator {
    command: Vec<String>,
}

impl CommandTerminator {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Terminator for CommandTerminator {
    fn kill(&mut self, name: &str) -> Result<(), TerminationError> {
        let (program, args) = self.command.split_first().ok_or(TerminationError::NoCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let status = cmd.status().map_err(|source| TerminationError::Spawn {
            name: name.to_string(),
            source,
        })?;
        if !status.success() {
            return Err(TerminationError::Status {
                name: name.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Consecutive qualifying samples seen in the current run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdleCounter {
    count: u32,
}

impl IdleCounter {
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Extends the run on a qualifying sample, otherwise starts over.
    pub fn record(&mut self, qualifying: bool) -> u32 {
        self.count = if qualifying { self.count + 1 } else { 0 };
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// No monitored process was running; nothing to kill.
    NothingRunning,
    /// The run completed and kill requests were issued.
    Triggered,
}

pub struct IdleKillWatchdog {
    counter: IdleCounter,
    run_length: u32,
    targets: Vec<String>,
    terminator: Box<dyn Terminator>,
    retry_backoff: Duration,
}

impl IdleKillWatchdog {
    pub fn new(
        config: &IdleKillConfig,
        targets: Vec<String>,
        terminator: Box<dyn Terminator>,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            counter: IdleCounter::default(),
            run_length: config.effective_run_length(),
            targets,
            terminator,
            retry_backoff,
        }
    }

    pub fn counter(&self) -> IdleCounter {
        self.counter
    }

    /// Samples until either no monitored process is left or a full run of low
    /// samples has been seen. Each invocation starts a fresh run.
    ///
    /// Query failures sleep `retry_backoff` and retry without consuming a sample.
    pub async fn run(&mut self, sampler: &mut Sampler) -> WatchdogOutcome {
        self.counter.reset();
        let names: Vec<&str> = self.targets.iter().map(String::as_str).collect();

        loop {
            let present = match sampler.any_process(&names) {
                Ok(present) => present,
                Err(e) => {
                    debug!("watchdog process query failed: {e}");
                    tokio::time::sleep(self.retry_backoff).await;
                    continue;
                }
            };
            if !present {
                self.counter.reset();
                return WatchdogOutcome::NothingRunning;
            }

            let delta = match sampler.traffic_delta().await {
                Ok(delta) => delta,
                Err(e) => {
                    debug!("watchdog traffic query failed: {e}");
                    tokio::time::sleep(self.retry_backoff).await;
                    continue;
                }
            };

            let count = self.counter.record(sampler.is_low(delta));
            if count >= self.run_length {
                info!(samples = count, "upload idle; terminating monitored processes");
                terminate_all(self.terminator.as_mut(), &names);
                self.counter.reset();
                return WatchdogOutcome::Triggered;
            }
        }
    }
}

/// Requests termination of every name. A failure for one name never stops
/// the attempts on the others.
fn terminate_all(terminator: &mut dyn Terminator, names: &[&str]) {
    for name in names {
        if let Err(e) = terminator.kill(name) {
            debug!("kill ignored: {e}");
        }
    }
}
