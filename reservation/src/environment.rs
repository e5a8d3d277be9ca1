//! Injected dependencies shared by every strategy.

use seatlock_core::environment::{Clock, SystemClock};
use seatlock_core::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default length of the in-critical-section processing step.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(100);

/// Clock and processing delay used by reservation attempts.
///
/// The processing delay stands in for work done between validating a seat
/// and writing the claim. It widens the race window so contention between
/// attempts is observable; set it to zero to disable it.
#[derive(Clone)]
pub struct ReservationEnvironment {
    /// Source of claim timestamps.
    pub clock: Arc<dyn Clock>,
    /// Delay between validation and write.
    pub processing_delay: Duration,
}

impl ReservationEnvironment {
    /// Create an environment from its parts.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, processing_delay: Duration) -> Self {
        Self {
            clock,
            processing_delay,
        }
    }

    /// System clock with the given processing delay.
    #[must_use]
    pub fn production(processing_delay: Duration) -> Self {
        Self::new(Arc::new(SystemClock), processing_delay)
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run the processing step.
    pub async fn process(&self) {
        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }
    }
}

impl Default for ReservationEnvironment {
    fn default() -> Self {
        Self::production(DEFAULT_PROCESSING_DELAY)
    }
}

impl fmt::Debug for ReservationEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReservationEnvironment")
            .field("processing_delay", &self.processing_delay)
            .finish_non_exhaustive()
    }
}
