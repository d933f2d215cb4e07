//! Mock IME probe for unit testing.
//!
//! Tests set the observation the probe should report next; the synchroniser
//! under test polls it like the real thing.  `observation_count` lets tests
//! assert how many polls occurred.

use std::sync::Mutex;

use super::{ImeObservation, ImeProbeError, ImeStateProbe};

/// A mock probe returning a test-controlled observation.
pub struct MockImeProbe {
    observation: Mutex<ImeObservation>,
    /// Number of `observe` calls so far.
    pub observation_count: Mutex<u32>,
    /// When set, `observe` returns this error once and then clears it.
    fail_next: Mutex<Option<String>>,
}

impl MockImeProbe {
    pub fn new(initial: ImeObservation) -> Self {
        Self {
            observation: Mutex::new(initial),
            observation_count: Mutex::new(0),
            fail_next: Mutex::new(None),
        }
    }

    /// Sets the observation returned by subsequent polls.
    pub fn set_observation(&self, observation: ImeObservation) {
        *self.observation.lock().unwrap() = observation;
    }

    /// Makes the next poll fail with a platform error.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }
}

impl Default for MockImeProbe {
    fn default() -> Self {
        Self::new(ImeObservation::Unknown)
    }
}

impl ImeStateProbe for MockImeProbe {
    fn observe(&self) -> Result<ImeObservation, ImeProbeError> {
        *self.observation_count.lock().unwrap() += 1;
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(ImeProbeError::Platform(message));
        }
        Ok(*self.observation.lock().unwrap())
    }
}
