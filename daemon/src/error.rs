use thiserror::Error;

/// A process or traffic query failed momentarily. Never fatal: the caller
/// skips the decision for this cycle and retries after a short backoff.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("process table unavailable")]
    ProcessTable,
    #[error("network counters unavailable")]
    NetworkCounters,
}

/// The volume subsystem could not be reached or rejected a request.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("volume control is not supported on this platform")]
    Unsupported,
    #[error("audio endpoint error: {0}")]
    Endpoint(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("cue file not found: {0}")]
    Missing(String),
    #[error("playback is not supported on this platform")]
    Unsupported,
    #[error("device busy or file unplayable: {0}")]
    Failed(String),
}

/// A privileged kill request for one process did not succeed.
#[derive(Debug, Error)]
pub enum TerminationError {
    #[error("failed to launch terminator for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("terminator for {name} exited with {status}")]
    Status { name: String, status: String },
    #[error("no terminator command configured")]
    NoCommand,
}

/// Failure anywhere in the volume floor-and-restore sequence.
#[derive(Debug, Error)]
pub enum CueError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
