use std::io;

use parking_lot::Mutex;
use quanta::Clock;
use thiserror::Error;
use tracing::debug;

use crate::{
    client::{DogStatsy, Inner},
    events::{Events, TransportError},
    sampling::{RandomSource, SampleRate, ThreadRandom},
    tags::TagSet,
    transport::{RemoteAddr, Transport},
    writer::MessageWriter,
};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8125;

/// Default tag carrying the deployment environment.
pub const ENVIRONMENT_TAG: &str = "node_env";

/// Default tag carrying the service name.
pub const SERVICE_TAG: &str = "service";

/// Errors that could occur while building a client.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to parse the remote address.
    #[error("invalid remote address: {reason}")]
    InvalidRemoteAddress {
        /// Details about the parsing failure.
        reason: String,
    },

    /// The sample rate was not within `(0, 1]`.
    #[error("invalid sample rate {rate} (must be greater than 0 and at most 1)")]
    InvalidSampleRate {
        /// The rejected rate.
        rate: f64,
    },

    /// Failed to open the transport to the remote address.
    #[error("failed to open {transport} transport: {source}")]
    Transport {
        /// ID of the transport being opened.
        transport: &'static str,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Builder for a [`DogStatsy`] client.
///
/// By default, metrics are sent over UDP to `localhost:8125`, are never sampled, and carry no default tags.
pub struct DogStatsyBuilder {
    host: String,
    port: u16,
    remote_addr: Option<RemoteAddr>,
    service: Option<String>,
    environment: Option<String>,
    default_tags: TagSet,
    sample_rate: f64,
    random: Box<dyn RandomSource>,
    clock: Option<Clock>,
    events: Events,
    transport: Option<Box<dyn Transport>>,
}

impl DogStatsyBuilder {
    /// Set the hostname of the remote server.
    ///
    /// Defaults to `localhost`.
    #[must_use]
    pub fn with_host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }

    /// Set the UDP port of the remote server.
    ///
    /// Defaults to 8125.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the remote address to send metrics to, overriding the host and port.
    ///
    /// For UDP, the address simply needs to be in the format of `<host>:<port>`. On Linux, a Unix domain socket in
    /// datagram mode can be used instead, with an address in the format of `unixgram://<path>`.
    ///
    /// # Errors
    ///
    /// If the given address is not able to be parsed as a valid address, an error will be returned indicating the
    /// reason.
    pub fn with_remote_address<A>(mut self, addr: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        let remote_addr = RemoteAddr::try_from(addr.as_ref())
            .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?;
        self.remote_addr = Some(remote_addr);
        Ok(self)
    }

    /// Set the service name, sent as the `service` tag on every metric.
    #[must_use]
    pub fn with_service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the deployment environment, sent as the `node_env` tag on every metric.
    ///
    /// The environment is never read from the process environment: callers that want to tag metrics with, for
    /// example, the value of an environment variable must read it themselves and pass it here.
    #[must_use]
    pub fn with_environment<E: Into<String>>(mut self, environment: E) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Add a tag to be sent on every metric.
    ///
    /// Default tags are written after the `node_env` and `service` tags, in the order they were first added. Adding a
    /// tag with the same key as an earlier one replaces its value.
    ///
    /// A `node_env` or `service` tag is equivalent to calling [`with_environment`][Self::with_environment] or
    /// [`with_service`][Self::with_service]: whichever call comes last wins.
    #[must_use]
    pub fn with_default_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        match key.as_str() {
            ENVIRONMENT_TAG => self.environment = Some(value.into()),
            SERVICE_TAG => self.service = Some(value.into()),
            _ => {
                self.default_tags.insert(key, value.into());
            }
        }
        self
    }

    /// Set the sample rate.
    ///
    /// Each metric is sent with a probability equal to the sample rate, and metrics that are sent carry the rate so
    /// that the remote server can scale them back up. The rate must be greater than 0 and at most 1, which is checked
    /// when the client is built.
    ///
    /// Defaults to 1, which sends every metric.
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the source of random numbers used for sampling.
    ///
    /// Defaults to [`ThreadRandom`].
    #[must_use]
    pub fn with_random_source<R>(mut self, random: R) -> Self
    where
        R: RandomSource + 'static,
    {
        self.random = Box::new(random);
        self
    }

    /// Set the clock used to measure timings started with [`DogStatsy::start_timer`] and
    /// [`DogStatsy::start_histogram`].
    ///
    /// Defaults to [`Clock::new`].
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register a hook to be called whenever a metric cannot be sent.
    ///
    /// Without a hook, transport errors are logged at `DEBUG` level and otherwise ignored.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.events.on_error(hook);
        self
    }

    /// Use the given transport instead of opening a socket to the remote address.
    #[must_use]
    pub fn with_transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Box::new(transport));
        self
    }

    fn build_default_tags(&mut self) -> TagSet {
        let mut default_tags = TagSet::new();
        if let Some(environment) = self.environment.take() {
            default_tags.insert(ENVIRONMENT_TAG, environment);
        }
        if let Some(service) = self.service.take() {
            default_tags.insert(SERVICE_TAG, service);
        }

        let extra_tags = std::mem::take(&mut self.default_tags);
        for (key, value) in extra_tags.iter() {
            default_tags.insert(key.to_string(), value.to_string());
        }

        default_tags
    }

    fn open_transport(&mut self) -> Result<Box<dyn Transport>, BuildError> {
        if let Some(transport) = self.transport.take() {
            return Ok(transport);
        }

        let remote_addr = match self.remote_addr.take() {
            Some(remote_addr) => remote_addr,
            None => RemoteAddr::try_from(format!("{}:{}", self.host, self.port).as_str())
                .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?,
        };

        remote_addr
            .open()
            .map_err(|source| BuildError::Transport { transport: remote_addr.transport_id(), source })
    }

    /// Builds the client.
    ///
    /// The remote address is resolved and the socket is opened here, so that emitting metrics never has to.
    ///
    /// # Errors
    ///
    /// If the sample rate is out of range, the remote address cannot be resolved, or the socket cannot be opened, an
    /// error will be returned.
    pub fn build(mut self) -> Result<DogStatsy, BuildError> {
        let sample_rate = SampleRate::new(self.sample_rate)
            .ok_or(BuildError::InvalidSampleRate { rate: self.sample_rate })?;

        let transport = self.open_transport()?;
        let default_tags = self.build_default_tags();

        debug!(
            transport = transport.transport_id(),
            %sample_rate,
            default_tags = default_tags.len(),
            "Built DogStatsD client."
        );

        Ok(DogStatsy::new(Inner {
            default_tags,
            sample_rate,
            random: self.random,
            clock: self.clock.unwrap_or_else(Clock::new),
            events: self.events,
            transport,
            writer: Mutex::new(MessageWriter::new()),
        }))
    }
}

impl Default for DogStatsyBuilder {
    fn default() -> Self {
        DogStatsyBuilder {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            remote_addr: None,
            service: None,
            environment: None,
            default_tags: TagSet::new(),
            sample_rate: 1.0,
            random: Box::new(ThreadRandom),
            clock: None,
            events: Events::new(),
            transport: None,
        }
    }
}
