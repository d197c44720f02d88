//! Pull fallback activation
//!
//! The pull fetch is the degradation path: a consumer fetches once when it
//! starts and finds the push stream down, and again each time the stream
//! drops after having been up. It never fetches while the stream is up.

use crate::store::{FeedState, ProfileOrdersState};

/// Decides when a consumer should run the pull fetch for one stream.
///
/// Create one per mounted consumer.
#[derive(Debug, Clone)]
pub struct FallbackTrigger {
    armed: bool,
}

impl FallbackTrigger {
    pub fn new() -> Self {
        Self { armed: true }
    }

    /// Feed an observation of the stream status; returns true when the pull
    /// fetch should run now
    pub fn observe(&mut self, connected: bool, push_error: bool) -> bool {
        if connected {
            self.armed = true;
            return false;
        }
        if push_error || !self.armed {
            return false;
        }
        self.armed = false;
        true
    }

    /// Observe the feed slice. A recorded push error holds the fetch back.
    pub fn observe_feed(&mut self, state: &FeedState) -> bool {
        self.observe(state.ws_connected, state.ws_error.is_some())
    }

    /// Observe the profile orders slice. Holds off while a fetch is in flight.
    pub fn observe_profile_orders(&mut self, state: &ProfileOrdersState) -> bool {
        if state.loading && !state.ws_connected {
            return false;
        }
        self.observe(state.ws_connected, false)
    }
}

impl Default for FallbackTrigger {
    fn default() -> Self {
        Self::new()
    }
}
