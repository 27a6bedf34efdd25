//! Scripted stand-ins for the OS collaborators, shared across test modules.
//!
//! Every fake is a cheap `Clone` handle over shared state: keep one clone in
//! the test to script inputs and inspect side effects, box the other.

#![cfg(test)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::{DeviceError, PlaybackError, QueryError, TerminationError};
use crate::indicator::IndicatorWindow;
use crate::media::{AudioPlayer, VolumeControl};
use crate::sampler::{NetworkCounters, ProcessChecker};
use crate::watchdog::Terminator;

// ── processes ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ProcessState {
    running: HashSet<String>,
    failures_left: u32,
    fail_at: Option<u32>,
    queries: u32,
}

#[derive(Clone, Default)]
pub struct FakeProcesses(Arc<Mutex<ProcessState>>);

impl FakeProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&self, names: &[&str]) {
        self.0.lock().unwrap().running = names.iter().map(|s| s.to_string()).collect();
    }

    /// The next `n` queries fail with [`QueryError::ProcessTable`].
    pub fn fail_next(&self, n: u32) {
        self.0.lock().unwrap().failures_left = n;
    }

    /// Query number `n`, counted from the first query ever made, fails.
    pub fn fail_query(&self, n: u32) {
        self.0.lock().unwrap().fail_at = Some(n);
    }

    pub fn queries(&self) -> u32 {
        self.0.lock().unwrap().queries
    }
}

impl ProcessChecker for FakeProcesses {
    fn exists(&mut self, name: &str) -> Result<bool, QueryError> {
        let mut state = self.0.lock().unwrap();
        state.queries += 1;
        if state.fail_at == Some(state.queries) {
            return Err(QueryError::ProcessTable);
        }
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(QueryError::ProcessTable);
        }
        Ok(state.running.contains(name))
    }
}

// ── network ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct NetworkState {
    total: u64,
    readings: VecDeque<u64>,
    failures_left: u32,
}

/// Counter fed from a queue of raw readings. Once the queue is drained the
/// counter stays flat, i.e. every further window reads as zero traffic.
#[derive(Clone, Default)]
pub struct FakeNetwork(Arc<Mutex<NetworkState>>);

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one measurement window per delta.
    pub fn push_deltas(&self, deltas: &[u64]) {
        let mut state = self.0.lock().unwrap();
        let mut total = state.readings.back().copied().unwrap_or(state.total);
        for delta in deltas {
            state.readings.push_back(total);
            total += delta;
            state.readings.push_back(total);
        }
    }

    pub fn push_raw_readings(&self, readings: &[u64]) {
        self.0.lock().unwrap().readings.extend(readings.iter().copied());
    }

    pub fn fail_next(&self, n: u32) {
        self.0.lock().unwrap().failures_left = n;
    }

    /// Readings not yet consumed.
    pub fn pending(&self) -> usize {
        self.0.lock().unwrap().readings.len()
    }
}

impl NetworkCounters for FakeNetwork {
    fn bytes_sent(&mut self) -> Result<u64, QueryError> {
        let mut state = self.0.lock().unwrap();
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(QueryError::NetworkCounters);
        }
        if let Some(reading) = state.readings.pop_front() {
            state.total = reading;
        }
        Ok(state.total)
    }
}

// ── indicator windows ─────────────────────────────────────────────────────────

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLog {
    pub visible: bool,
    pub shows: u32,
    pub hides: u32,
}

#[derive(Clone, Default)]
pub struct FakeWindow(Arc<Mutex<WindowLog>>);

impl FakeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> WindowLog {
        *self.0.lock().unwrap()
    }

    pub fn visible(&self) -> bool {
        self.log().visible
    }
}

impl IndicatorWindow for FakeWindow {
    fn show(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.visible = true;
        log.shows += 1;
    }

    fn hide(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.visible = false;
        log.hides += 1;
    }
}

// ── volume + playback ─────────────────────────────────────────────────────────

#[derive(Default)]
struct VolumeState {
    level: f32,
    muted: bool,
    set_calls: Vec<f32>,
    unavailable: bool,
}

#[derive(Clone, Default)]
pub struct FakeVolume(Arc<Mutex<VolumeState>>);

impl FakeVolume {
    pub fn with_level(level: f32) -> Self {
        let v = Self::default();
        v.0.lock().unwrap().level = level;
        v
    }

    pub fn set_muted(&self, muted: bool) {
        self.0.lock().unwrap().muted = muted;
    }

    pub fn make_unavailable(&self) {
        self.0.lock().unwrap().unavailable = true;
    }

    pub fn level(&self) -> f32 {
        self.0.lock().unwrap().level
    }

    pub fn muted(&self) -> bool {
        self.0.lock().unwrap().muted
    }

    pub fn set_calls(&self) -> Vec<f32> {
        self.0.lock().unwrap().set_calls.clone()
    }
}

impl VolumeControl for FakeVolume {
    fn set_mute(&mut self, muted: bool) -> Result<(), DeviceError> {
        let mut state = self.0.lock().unwrap();
        if state.unavailable {
            return Err(DeviceError::Endpoint("no default render endpoint".into()));
        }
        state.muted = muted;
        Ok(())
    }

    fn level(&mut self) -> Result<f32, DeviceError> {
        let state = self.0.lock().unwrap();
        if state.unavailable {
            return Err(DeviceError::Endpoint("no default render endpoint".into()));
        }
        Ok(state.level)
    }

    fn set_level(&mut self, level: f32) -> Result<(), DeviceError> {
        let mut state = self.0.lock().unwrap();
        if state.unavailable {
            return Err(DeviceError::Endpoint("no default render endpoint".into()));
        }
        state.level = level;
        state.set_calls.push(level);
        Ok(())
    }
}

#[derive(Default)]
struct PlayerState {
    played: Vec<String>,
    /// Level the volume was at when each cue played.
    levels: Vec<f32>,
    broken: bool,
}

/// Records every cue; optionally observes a [`FakeVolume`] so tests can check
/// the level during playback.
#[derive(Clone, Default)]
pub struct FakePlayer {
    state: Arc<Mutex<PlayerState>>,
    volume: Option<FakeVolume>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observing(volume: &FakeVolume) -> Self {
        Self {
            state: Arc::default(),
            volume: Some(volume.clone()),
        }
    }

    pub fn break_device(&self) {
        self.state.lock().unwrap().broken = true;
    }

    pub fn played(&self) -> Vec<String> {
        self.state.lock().unwrap().played.clone()
    }

    pub fn levels(&self) -> Vec<f32> {
        self.state.lock().unwrap().levels.clone()
    }
}

impl AudioPlayer for FakePlayer {
    fn play(&mut self, path: &str) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().unwrap();
        if state.broken {
            return Err(PlaybackError::Failed("device busy".into()));
        }
        state.played.push(path.to_string());
        if let Some(volume) = &self.volume {
            state.levels.push(volume.level());
        }
        Ok(())
    }
}

// ── terminator ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct TerminatorState {
    attempts: Vec<String>,
    refuse: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct FakeTerminator(Arc<Mutex<TerminatorState>>);

impl FakeTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill requests for `name` fail.
    pub fn refuse(&self, name: &str) {
        self.0.lock().unwrap().refuse.insert(name.to_string());
    }

    pub fn attempts(&self) -> Vec<String> {
        self.0.lock().unwrap().attempts.clone()
    }
}

impl Terminator for FakeTerminator {
    fn kill(&mut self, name: &str) -> Result<(), TerminationError> {
        let mut state = self.0.lock().unwrap();
        state.attempts.push(name.to_string());
        if state.refuse.contains(name) {
            return Err(TerminationError::Status {
                name: name.to_string(),
                status: "exit code: 1".into(),
            });
        }
        Ok(())
    }
}
