//! # rust_kvlog
//!
//! Structured key-value logging with concurrent, independently configured
//! sinks.
//!
//! A [`Broker`] keeps a registry of sinks. Each [`Sink`] writes to one
//! [`Destination`] through its own worker thread, filter set, hidden keys
//! and [`Formatter`]. A [`Logger`] merges its context and pending pairs with
//! the pairs of each call into a record and hands it to every running sink,
//! returning once all of them have dealt with it.
//!
//! ## Features
//!
//! - **Ordered key-value records**: later values override earlier ones in place
//! - **Per-sink filters**: key presence, value sets, integer, float and time ranges, closures
//! - **Redaction**: hidden keys take part in filtering but never reach the output
//! - **Formatters**: logfmt and JSON Lines, or your own
//! - **Synchronous flush and close**: no record is left half-handled
//!
//! ## Example
//!
//! ```
//! use rust_kvlog::prelude::*;
//!
//! let broker = Broker::new();
//! let (destination, buffer) = Destination::memory();
//!
//! broker
//!     .sink_to(&destination, LogfmtFormatter::new())
//!     .with_int_range("status", 399, 600)
//!     .start();
//!
//! let mut logger = broker.logger();
//! logger.with(["service", "gateway"]);
//! logger.log(args!["status", 200, "path", "/health"]);
//! logger.log(args!["status", 502, "path", "/orders"]);
//!
//! assert_eq!(buffer.contents(), "service=gateway status=502 path=/orders\n");
//! ```

pub mod core;
pub mod formatters;
pub mod location;
pub mod macros;

pub mod prelude {
    pub use crate::core::{
        Arg, Broker, BrokerBuilder, BrokerConfig, Destination, Field, Filter, FilterKind,
        Formatter, LazyValue, Logger, LoggerError, MemoryBuffer, Pair, Result, Sink,
        SinkMetrics, TimestampFormat, Value,
    };
    pub use crate::formatters::{JsonFormatter, LogfmtFormatter};
    pub use crate::location::{what, Parts};
    pub use crate::{args, here, log};
}

pub use crate::core::{
    Arg, Broker, BrokerBuilder, BrokerConfig, Destination, ErrorCallback, Field, Filter,
    FilterKind, FloatRangeFilter, Formatter, IntRangeFilter, KeyFilter, LazyValue, Logger,
    LoggerError, MemoryBuffer, Pair, PairValue, Record, Result, Sink, SinkMetrics,
    TimeRangeFilter, TimestampFormat, Value, ValuesFilter, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use formatters::{JsonFormatter, LogfmtFormatter};
