use std::time::Duration;

use quanta::Instant;

use crate::{client::DogStatsy, tags::Tag, writer::MetricType};

/// A started measurement, emitted when stopped.
///
/// Returned by [`DogStatsy::start_timer`] and [`DogStatsy::start_histogram`]. Calling [`stop`][StopTimer::stop] emits
/// the number of whole milliseconds elapsed since the measurement was started.
///
/// `stop` can be called more than once. Each call is an independent emission, with the elapsed time measured from the
/// same starting point, so stopping twice reports two (growing) durations rather than the time between the calls.
#[derive(Debug)]
pub struct StopTimer {
    client: DogStatsy,
    name: String,
    metric_type: MetricType,
    start: Instant,
}

impl StopTimer {
    pub(crate) fn new(client: DogStatsy, name: String, metric_type: MetricType) -> Self {
        let start = client.clock().now();
        StopTimer { client, name, metric_type, start }
    }

    /// Returns the metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the time elapsed since the measurement was started.
    pub fn elapsed(&self) -> Duration {
        self.client.clock().now().saturating_duration_since(self.start)
    }

    /// Emits the elapsed time, in milliseconds, with the given call-site tags.
    ///
    /// Returns `false` if the metric was suppressed by sampling.
    pub fn stop(&self, tags: &[Tag]) -> bool {
        let elapsed_ms = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.client.write(&self.name, elapsed_ms, self.metric_type, tags)
    }
}
