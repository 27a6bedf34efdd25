//! Boolean latch that remembers the last state acted upon.
//!
//! A side effect fires only when a raw reading differs from the latched value;
//! the latch moves to the new value in the same call, so repeating a reading
//! is a no-op.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    On,
    Off,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    on: bool,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Feeds a raw reading. Returns the transition the caller must act on,
    /// or `None` when the reading matches the latched state.
    pub fn update(&mut self, raw: bool) -> Option<Transition> {
        if raw == self.on {
            return None;
        }
        self.on = raw;
        Some(if raw { Transition::On } else { Transition::Off })
    }
}
