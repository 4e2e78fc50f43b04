//! In-memory providers for testing without capture hardware.
//!
//! These implement the provider and container traits well enough to drive
//! the full recording pipeline in CI or in an embedding application's own
//! tests.

mod container;
mod microphone;
mod screen;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::media::Sample;
use crate::traits::screen_provider::SampleCallback;

pub use container::{MemoryContainerBackend, MemoryContainerState};
pub use microphone::{MockMicrophoneProvider, MockMicrophoneSession};
pub use screen::{MockScreenProvider, MockScreenStream};

/// Handle for pushing samples into a mock provider from any thread.
///
/// Pushing calls the registered provider callback on the caller's thread,
/// the way a platform capture thread would.
#[derive(Clone, Default)]
pub struct MockFeed {
    callback: Arc<Mutex<Option<SampleCallback>>>,
}

impl MockFeed {
    /// Deliver `sample`. Returns `false` if no callback has been registered.
    pub fn push(&self, sample: Sample) -> bool {
        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => {
                callback(sample);
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.callback.lock().is_some()
    }

    fn attach(&self, callback: SampleCallback) {
        *self.callback.lock() = Some(callback);
    }
}
