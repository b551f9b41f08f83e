use std::fmt;

use parking_lot::Mutex;
use rand::{Rng as _, RngCore};

/// A source of uniformly distributed random numbers used to make sampling decisions.
///
/// Implementations must return values in the half-open range `[0, 1)`.
///
/// The default source, [`ThreadRandom`], draws from the thread-local generator provided by `rand`. For deterministic
/// sampling, any seeded generator can be used by wrapping it in a [`parking_lot::Mutex`]:
///
/// ```
/// # use dogstatsy::DogStatsyBuilder;
/// use parking_lot::Mutex;
/// use rand::SeedableRng as _;
/// use rand_xoshiro::Xoshiro256StarStar;
///
/// let builder = DogStatsyBuilder::default()
///     .with_sample_rate(0.25)
///     .with_random_source(Mutex::new(Xoshiro256StarStar::seed_from_u64(42)));
/// ```
pub trait RandomSource: Send + Sync {
    /// Draws the next number in `[0, 1)`.
    fn next_f64(&self) -> f64;
}

/// Random source backed by the thread-local generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

impl<R> RandomSource for Mutex<R>
where
    R: RngCore + Send,
{
    fn next_f64(&self) -> f64 {
        self.lock().random::<f64>()
    }
}

/// Probability that any given metric is actually sent.
///
/// Always within `(0, 1]`. A rate of `1` means every metric is sent and no sampling clause is written.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct SampleRate(f64);

/// Outcome of a sampling decision for a single metric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Decision {
    /// No sampling is configured: send, without a sampling clause.
    Unsampled,

    /// The draw fell within the rate: send, with a sampling clause.
    Sampled(SampleRate),

    /// The draw exceeded the rate: do not send.
    Suppressed,
}

impl SampleRate {
    /// Send every metric.
    pub const ALWAYS: SampleRate = SampleRate(1.0);

    /// Creates a `SampleRate`, or `None` if `rate` is not within `(0, 1]`.
    pub fn new(rate: f64) -> Option<Self> {
        (rate > 0.0 && rate <= 1.0).then_some(SampleRate(rate))
    }

    /// Returns the rate as a float.
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Returns `true` if every metric is sent.
    pub fn is_always(self) -> bool {
        self.0 >= 1.0
    }

    pub(crate) fn decide(self, source: &dyn RandomSource) -> Decision {
        if self.is_always() {
            return Decision::Unsampled;
        }

        if source.next_f64() > self.0 {
            Decision::Suppressed
        } else {
            Decision::Sampled(self)
        }
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::ALWAYS
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut float_writer = ryu::Buffer::new();
        f.write_str(float_writer.format(self.0))
    }
}
