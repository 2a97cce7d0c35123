//! Core types: values, records, sinks and the broker

pub mod broker;
pub(crate) mod dispatch;
pub mod destination;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod logger;
pub mod metrics;
pub mod pair;
pub mod record;
pub mod sink;
pub mod timestamp;
pub mod value;

pub use broker::{
    Broker, BrokerBuilder, BrokerConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use destination::{Destination, MemoryBuffer};
pub use error::{ErrorCallback, LoggerError, Result};
pub use filter::{
    Filter, FilterKind, FloatRangeFilter, IntRangeFilter, KeyFilter, TimeRangeFilter,
    ValuesFilter,
};
pub use formatter::Formatter;
pub use logger::Logger;
pub use metrics::SinkMetrics;
pub use pair::{Arg, LazyValue, Pair, PairValue};
pub use record::{Field, Record};
pub use sink::Sink;
pub use timestamp::TimestampFormat;
pub use value::Value;
