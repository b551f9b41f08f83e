//! A small, fire-and-forget client for sending metrics to a [DogStatsD][dsd]-compatible server.
//!
//! [dsd]: https://docs.datadoghq.com/developers/dogstatsd/
//!
//! # Usage
//!
//! ```no_run
//! # use dogstatsy::{DogStatsyBuilder, Tag};
//! // Create a client. Every metric it sends is tagged with the service name and environment.
//! let client = DogStatsyBuilder::default()
//!     .with_host("localhost")
//!     .with_port(8125)
//!     .with_service("web")
//!     .with_environment("production")
//!     .build()
//!     .expect("failed to build client");
//!
//! // Sends `active.users:42|g|#node_env:production,service:web`.
//! client.gauge("active.users", 42, &[]);
//!
//! // Sends `page.views:1|c|#node_env:production,service:web,route:/home`.
//! client.incr("page.views", &[Tag::new("route", "/home")]);
//!
//! // Timings can be measured by the client.
//! let timer = client.start_timer("request.latency");
//! // ... handle the request ...
//! timer.stop(&[]);
//! ```
//!
//! # Wire format
//!
//! Each metric is sent as a single datagram containing one line:
//!
//! ```text
//! <name>:<value>|<type>[|@<sample rate>][|#<key>:<value>,...]
//! ```
//!
//! where `<type>` is one of `g` (gauge), `c` (count), `m` (meter), `ms` (timer), `h` (histogram) or `s` (set). The tag
//! clause lists the client's default tags followed by any call-site tags, and is left out entirely when there are no
//! tags at all.
//!
//! Names, values and tags are not escaped or validated. Callers must avoid `:`, `,` and `|` in metric names and tags.
//!
//! # Sampling
//!
//! With a sample rate below 1, each metric is sent with a probability equal to the rate, and carries a `|@<rate>`
//! clause so the remote server can scale it back up. Metrics dropped by sampling are never encoded, and the emitting
//! call returns `false`. The random source used for these decisions can be swapped out, which makes sampling
//! deterministic under a seeded generator.
//!
//! # Errors
//!
//! Emitting a metric never fails from the caller's point of view. Sends are non-blocking and are not retried: if the
//! transport reports an error, it is passed to the error hook registered with [`DogStatsyBuilder::on_error`], or logged
//! at `DEBUG` level if there is none, and the metric is dropped.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, DogStatsyBuilder, ENVIRONMENT_TAG, SERVICE_TAG};

mod client;
pub use self::client::DogStatsy;

mod events;
pub use self::events::{Events, TransportError};

mod sampling;
pub use self::sampling::{RandomSource, SampleRate, ThreadRandom};

mod tags;
pub use self::tags::{SharedString, Tag, TagSet};

mod timer;
pub use self::timer::StopTimer;

mod transport;
pub use self::transport::Transport;

mod writer;
pub use self::writer::{encode, MessageWriter, MetricType, MetricValue};
