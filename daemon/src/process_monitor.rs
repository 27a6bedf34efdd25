use sysinfo::{Networks, ProcessesToUpdate, System};

use crate::error::QueryError;
use crate::sampler::{NetworkCounters, ProcessChecker};

/// Process presence backed by the OS process table.
///
/// The table is refreshed on every query. An empty table after refresh means
/// the snapshot failed, and is reported as a transient [`QueryError`] rather
/// than "nothing is running".
pub struct SysinfoProcesses {
    sys: System,
}

impl SysinfoProcesses {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    fn refresh(&mut self) -> Result<(), QueryError> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
        if self.sys.processes().is_empty() {
            return Err(QueryError::ProcessTable);
        }
        Ok(())
    }

    fn running(&self, target: &str) -> bool {
        let target = target.to_lowercase();
        self.sys
            .processes()
            .values()
            .any(|p| p.name().to_string_lossy().to_lowercase() == target)
    }
}

impl ProcessChecker for SysinfoProcesses {
    fn exists(&mut self, name: &str) -> Result<bool, QueryError> {
        self.refresh()?;
        Ok(self.running(name))
    }

    /// One refresh serves all names.
    fn exists_any(&mut self, names: &[&str]) -> Result<bool, QueryError> {
        self.refresh()?;
        Ok(names.iter().any(|name| self.running(name)))
    }
}

/// Sum of bytes transmitted on every interface since boot.
pub struct SysinfoNetwork {
    networks: Networks,
}

impl SysinfoNetwork {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl NetworkCounters for SysinfoNetwork {
    fn bytes_sent(&mut self) -> Result<u64, QueryError> {
        self.networks.refresh();
        if self.networks.list().is_empty() {
            return Err(QueryError::NetworkCounters);
        }
        Ok(self
            .networks
            .list()
            .values()
            .map(|data| data.total_transmitted())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The test binary itself is always in the process table.
    #[test]
    fn finds_own_process_case_insensitively() {
        let mut procs = SysinfoProcesses::new();
        let own = std::env::current_exe().unwrap();
        let name = own.file_name().unwrap().to_string_lossy().to_uppercase();
        // Linux truncates process names to 15 bytes, so only assert when it fits.
        if name.len() <= 15 {
            assert!(procs.exists(&name).unwrap());
        }
    }

    #[test]
    fn unknown_process_is_absent() {
        let mut procs = SysinfoProcesses::new();
        assert!(!procs
            .exists_any(&["status-prompter-definitely-not-running.exe"])
            .unwrap());
    }
}
