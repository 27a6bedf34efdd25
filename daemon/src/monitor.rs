//! The polling loop: sample, debounce, act.
//!
//! One cycle runs, in order: the three process indicators, the compound
//! low-traffic indicator, the media cue and, when enabled, the idle-kill
//! watchdog. All state lives in [`LoopState`] and is touched only from the
//! loop's own task.

use std::time::Duration;

use tracing::debug;

use crate::config::{Config, ProcessConfig};
use crate::error::QueryError;
use crate::indicator::{Indicator, IndicatorWindow, Signal};
use crate::media::MediaCue;
use crate::sampler::Sampler;
use crate::watchdog::IdleKillWatchdog;

/// Every latch the loop owns, plus handles to the indicator windows.
pub struct LoopState {
    pub screen: Indicator,
    pub camera: Indicator,
    pub remote: Indicator,
    pub low_traffic: Indicator,
    pub media: MediaCue,
    pub watchdog: Option<IdleKillWatchdog>,
}

impl LoopState {
    pub fn new<F>(
        mut window_for: F,
        media: MediaCue,
        watchdog: Option<IdleKillWatchdog>,
    ) -> Self
    where
        F: FnMut(Signal) -> Box<dyn IndicatorWindow>,
    {
        let mut indicator = |signal: Signal| Indicator::new(signal, window_for(signal));
        Self {
            screen: indicator(Signal::ScreenCapture),
            camera: indicator(Signal::CameraCapture),
            remote: indicator(Signal::RemoteDesktop),
            low_traffic: indicator(Signal::LowNetworkTraffic),
            media,
            watchdog,
        }
    }

    /// True while any process-backed indicator is lit.
    pub fn any_activity(&self) -> bool {
        self.screen.is_on() || self.camera.is_on() || self.remote.is_on()
    }

    /// Lights the low-traffic indicator only when traffic is low and there is
    /// displayed activity to annotate.
    pub fn apply_traffic(&mut self, traffic_low: bool) {
        let lit = traffic_low && self.any_activity();
        self.low_traffic.apply(lit);
    }

    /// Hides every indicator window.
    pub fn release(&mut self) {
        for indicator in [
            &mut self.screen,
            &mut self.camera,
            &mut self.remote,
            &mut self.low_traffic,
        ] {
            indicator.release();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to the end; wait the normal cadence.
    Completed,
    /// A query failed and the rest of the cycle was abandoned; retry after the backoff.
    Skipped,
}

struct Presence {
    screen: bool,
    camera: bool,
    remote: bool,
}

pub struct Monitor {
    state: LoopState,
    sampler: Sampler,
    processes: ProcessConfig,
    cadence: Duration,
    retry_backoff: Duration,
}

impl Monitor {
    pub fn new(config: &Config, state: LoopState, sampler: Sampler) -> Self {
        Self {
            state,
            sampler,
            processes: config.processes.clone(),
            cadence: config.effective_poll_interval(),
            retry_backoff: config.monitor.retry_backoff(),
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Runs cycles forever. Returns only if the future is dropped.
    pub async fn run(&mut self) {
        loop {
            let pause = match self.run_cycle().await {
                CycleOutcome::Completed => self.cadence,
                CycleOutcome::Skipped => self.retry_backoff,
            };
            tokio::time::sleep(pause).await;
        }
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        // Process indicators. A failed query leaves every latch untouched.
        let presence = match self.sample_presence() {
            Ok(presence) => presence,
            Err(e) => {
                debug!("process query failed, skipping cycle: {e}");
                return CycleOutcome::Skipped;
            }
        };
        self.state.screen.apply(presence.screen);
        self.state.camera.apply(presence.camera);
        self.state.remote.apply(presence.remote);

        // Compound low-traffic indicator, from the latches just applied.
        match self.sampler.low_traffic().await {
            Ok(low) => self.state.apply_traffic(low),
            Err(e) => {
                debug!("traffic query failed, skipping cycle: {e}");
                return CycleOutcome::Skipped;
            }
        }

        // Media cue, from a fresh camera reading.
        let camera = match self.sampler.process(&self.processes.camera_capture) {
            Ok(camera) => camera,
            Err(e) => {
                debug!("camera query failed, skipping cycle: {e}");
                return CycleOutcome::Skipped;
            }
        };
        let traffic_low = if self.state.media.awaiting_start(camera) {
            self.sampler.low_traffic().await
        } else {
            Ok(false)
        };
        match traffic_low {
            Ok(traffic_low) => {
                self.state.media.update(camera, traffic_low);
            }
            Err(e) => debug!("traffic query failed, media cue undecided: {e}"),
        }

        if let Some(watchdog) = self.state.watchdog.as_mut() {
            match self.sampler.low_traffic().await {
                Ok(true) => {
                    let outcome = watchdog.run(&mut self.sampler).await;
                    debug!(?outcome, "watchdog finished");
                }
                Ok(false) => {}
                Err(e) => debug!("traffic query failed, watchdog not entered: {e}"),
            }
        }

        CycleOutcome::Completed
    }

    pub fn release(&mut self) {
        self.state.release();
    }

    fn sample_presence(&mut self) -> Result<Presence, QueryError> {
        Ok(Presence {
            screen: self.sampler.process(&self.processes.screen_capture)?,
            camera: self.sampler.process(&self.processes.camera_capture)?,
            remote: self.sampler.process(&self.processes.remote_desktop)?,
        })
    }
}
