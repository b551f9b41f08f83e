use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use quanta::Clock;
use tracing::trace;

use crate::{
    builder::DogStatsyBuilder,
    events::{Events, TransportError},
    sampling::{Decision, RandomSource, SampleRate},
    tags::{Tag, TagSet},
    timer::StopTimer,
    transport::Transport,
    writer::{MessageWriter, MetricType, MetricValue},
};

pub(crate) struct Inner {
    pub default_tags: TagSet,
    pub sample_rate: SampleRate,
    pub random: Box<dyn RandomSource>,
    pub clock: Clock,
    pub events: Events,
    pub transport: Box<dyn Transport>,
    pub writer: Mutex<MessageWriter>,
}

/// A DogStatsD client.
///
/// Every emitting method sends at most one datagram, synchronously, and returns without waiting for any
/// acknowledgement. The returned `bool` is `false` only when sampling suppressed the metric; transport failures are
/// routed to the error hook registered at construction and never reach the caller.
///
/// Every metric carries the client's default tags, followed by any call-site tags. The two are not deduplicated.
///
/// `DogStatsy` is cheap to clone, and clones share the same configuration and transport.
#[derive(Clone)]
pub struct DogStatsy {
    inner: Arc<Inner>,
}

impl DogStatsy {
    pub(crate) fn new(inner: Inner) -> Self {
        DogStatsy { inner: Arc::new(inner) }
    }

    /// Creates a builder with the default configuration.
    pub fn builder() -> DogStatsyBuilder {
        DogStatsyBuilder::default()
    }

    /// Returns the tags attached to every metric.
    pub fn default_tags(&self) -> &TagSet {
        &self.inner.default_tags
    }

    /// Returns the sample rate applied to every metric.
    pub fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate
    }

    pub(crate) fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Writes a metric of the given type.
    ///
    /// All of the typed methods funnel through here. Returns `false` if the metric was suppressed by sampling, in which
    /// case nothing is encoded or sent.
    pub fn write<V>(&self, name: &str, value: V, metric_type: MetricType, tags: &[Tag]) -> bool
    where
        V: Into<MetricValue>,
    {
        let maybe_sample_rate = match self.inner.sample_rate.decide(self.inner.random.as_ref()) {
            Decision::Unsampled => None,
            Decision::Sampled(rate) => Some(rate),
            Decision::Suppressed => {
                trace!(metric_name = name, metric_type = metric_type.suffix(), "Metric suppressed by sampling.");
                return false;
            }
        };

        // The writer is only held while encoding and sending, so the error hook is free to emit metrics itself.
        let (payload_len, result) = {
            let mut writer = self.inner.writer.lock();
            let message = writer.write(
                name,
                value.into(),
                metric_type,
                maybe_sample_rate,
                &self.inner.default_tags,
                tags,
            );
            (message.len(), self.inner.transport.send(message.as_bytes()))
        };

        match result {
            Ok(sent) => trace!(payload_len, sent, "Sent metric."),
            Err(e) => {
                let error = TransportError::new(self.inner.transport.transport_id(), payload_len, e);
                self.inner.events.emit_error(&error);
            }
        }

        true
    }

    /// Sends a gauge value.
    pub fn gauge<V: Into<MetricValue>>(&self, name: &str, value: V, tags: &[Tag]) -> bool {
        self.write(name, value, MetricType::Gauge, tags)
    }

    /// Sends a set member.
    pub fn set<V: Into<MetricValue>>(&self, name: &str, value: V, tags: &[Tag]) -> bool {
        self.write(name, value, MetricType::Set, tags)
    }

    /// Sends a meter value.
    pub fn meter<V: Into<MetricValue>>(&self, name: &str, value: V, tags: &[Tag]) -> bool {
        self.write(name, value, MetricType::Meter, tags)
    }

    /// Sends a counter delta.
    pub fn count<V: Into<MetricValue>>(&self, name: &str, value: V, tags: &[Tag]) -> bool {
        self.write(name, value, MetricType::Count, tags)
    }

    /// Increments a counter by one.
    pub fn incr(&self, name: &str, tags: &[Tag]) -> bool {
        self.incr_by(name, 1, tags)
    }

    /// Increments a counter by `value`.
    pub fn incr_by(&self, name: &str, value: i64, tags: &[Tag]) -> bool {
        self.count(name, value, tags)
    }

    /// Decrements a counter by one.
    pub fn decr(&self, name: &str, tags: &[Tag]) -> bool {
        self.decr_by(name, 1, tags)
    }

    /// Decrements a counter by `value`.
    pub fn decr_by(&self, name: &str, value: i64, tags: &[Tag]) -> bool {
        self.count(name, value.saturating_neg(), tags)
    }

    /// Increments a counter by `value` for each of the given names.
    ///
    /// Returns the number of counters that were sent, which is less than the number of names only when sampling
    /// suppressed some of them. Each name is sampled independently.
    pub fn update_stats<I, S>(&self, names: I, value: i64, tags: &[Tag]) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().filter(|name| self.count(name.as_ref(), value, tags)).count()
    }

    /// Sends a timing, in milliseconds.
    pub fn timer<V: Into<MetricValue>>(&self, name: &str, value: V, tags: &[Tag]) -> bool {
        self.write(name, value, MetricType::Timer, tags)
    }

    /// Starts a timing, which is sent as a timer when the returned handle is stopped.
    pub fn start_timer<N: Into<String>>(&self, name: N) -> StopTimer {
        StopTimer::new(self.clone(), name.into(), MetricType::Timer)
    }

    /// Sends a histogram sample.
    pub fn histogram<V: Into<MetricValue>>(&self, name: &str, value: V, tags: &[Tag]) -> bool {
        self.write(name, value, MetricType::Histogram, tags)
    }

    /// Starts a timing, which is sent as a histogram sample when the returned handle is stopped.
    pub fn start_histogram<N: Into<String>>(&self, name: N) -> StopTimer {
        StopTimer::new(self.clone(), name.into(), MetricType::Histogram)
    }
}

impl fmt::Debug for DogStatsy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DogStatsy")
            .field("default_tags", &self.inner.default_tags)
            .field("sample_rate", &self.inner.sample_rate)
            .field("transport", &self.inner.transport.transport_id())
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}
