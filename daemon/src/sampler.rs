use std::time::Duration;

use crate::error::QueryError;

/// Answers "is a process with this executable name running?".
pub trait ProcessChecker {
    fn exists(&mut self, name: &str) -> Result<bool, QueryError>;

    /// True iff at least one of `names` is running.
    fn exists_any(&mut self, names: &[&str]) -> Result<bool, QueryError> {
        for name in names {
            if self.exists(name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Cumulative outbound byte counter across all interfaces.
pub trait NetworkCounters {
    fn bytes_sent(&mut self) -> Result<u64, QueryError>;
}

/// Reads the raw signals the monitor loop decides on.
///
/// Traffic measurements borrow the sampler mutably across their window, so two
/// measurement windows can never overlap.
pub struct Sampler {
    processes: Box<dyn ProcessChecker>,
    network: Box<dyn NetworkCounters>,
    window: Duration,
    threshold_bytes: u64,
}

impl Sampler {
    pub fn new(
        processes: Box<dyn ProcessChecker>,
        network: Box<dyn NetworkCounters>,
        window: Duration,
        threshold_bytes: u64,
    ) -> Self {
        Self {
            processes,
            network,
            window,
            threshold_bytes,
        }
    }

    pub fn process(&mut self, name: &str) -> Result<bool, QueryError> {
        self.processes.exists(name)
    }

    pub fn any_process(&mut self, names: &[&str]) -> Result<bool, QueryError> {
        self.processes.exists_any(names)
    }

    /// Outbound bytes sent during one measurement window. Suspends the caller
    /// for the whole window.
    pub async fn traffic_delta(&mut self) -> Result<u64, QueryError> {
        let before = self.network.bytes_sent()?;
        tokio::time::sleep(self.window).await;
        let after = self.network.bytes_sent()?;
        // Counters can go backwards when an interface disappears.
        Ok(after.saturating_sub(before))
    }

    pub fn is_low(&self, delta: u64) -> bool {
        delta <= self.threshold_bytes
    }

    /// Measures one window and reports whether outbound traffic stayed at or
    /// below the threshold.
    pub async fn low_traffic(&mut self) -> Result<bool, QueryError> {
        let delta = self.traffic_delta().await?;
        Ok(self.is_low(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeNetwork, FakeProcesses};

    fn sampler(processes: FakeProcesses, network: FakeNetwork) -> Sampler {
        Sampler::new(
            Box::new(processes),
            Box::new(network),
            Duration::from_secs(1),
            102_400,
        )
    }

    // ── process presence ──────────────────────────────────────────────────────

    #[test]
    fn any_process_is_logical_or() {
        let procs = FakeProcesses::new();
        procs.set_running(&["rtcRemoteDesktop.exe"]);
        let mut s = sampler(procs, FakeNetwork::new());

        assert!(s.any_process(&["media_capture.exe", "rtcRemoteDesktop.exe"]).unwrap());
        assert!(!s.any_process(&["media_capture.exe", "screenCapture.exe"]).unwrap());
        assert!(!s.any_process(&[]).unwrap());
    }

    #[test]
    fn query_failure_propagates() {
        let procs = FakeProcesses::new();
        procs.fail_next(1);
        let mut s = sampler(procs, FakeNetwork::new());

        assert_eq!(s.process("media_capture.exe"), Err(QueryError::ProcessTable));
        assert_eq!(s.process("media_capture.exe"), Ok(false));
    }

    // ── traffic ───────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn low_traffic_threshold_is_inclusive() {
        let net = FakeNetwork::new();
        net.push_deltas(&[102_400, 102_401, 0]);
        let mut s = sampler(FakeProcesses::new(), net);

        assert!(s.low_traffic().await.unwrap());
        assert!(!s.low_traffic().await.unwrap());
        assert!(s.low_traffic().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn measurement_suspends_for_one_window() {
        let net = FakeNetwork::new();
        net.push_deltas(&[50_000]);
        let mut s = sampler(FakeProcesses::new(), net);

        let start = tokio::time::Instant::now();
        assert_eq!(s.traffic_delta().await.unwrap(), 50_000);
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn counter_going_backwards_reads_as_zero() {
        let net = FakeNetwork::new();
        net.push_raw_readings(&[10_000, 4_000]);
        let mut s = sampler(FakeProcesses::new(), net);

        assert_eq!(s.traffic_delta().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn counter_failure_propagates() {
        let net = FakeNetwork::new();
        net.fail_next(1);
        let mut s = sampler(FakeProcesses::new(), net);

        assert_eq!(s.low_traffic().await, Err(QueryError::NetworkCounters));
    }
}
