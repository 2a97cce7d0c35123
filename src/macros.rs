//! Macros for building argument lists and logging with them.
//!
//! Logger methods take a flat `key, value, key, value, ...` sequence. When
//! the values have different types, `args!` converts each one to an
//! [`Arg`](crate::Arg) so they fit in one list.
//!
//! # Examples
//!
//! ```
//! use rust_kvlog::{args, log, Broker, Destination, LogfmtFormatter, Pair};
//!
//! let broker = Broker::new();
//! let (destination, buffer) = Destination::memory();
//! broker.sink_to(&destination, LogfmtFormatter::new()).start();
//! let mut logger = broker.logger();
//!
//! // Mixed value types
//! logger.add(args!["user", "alice", "attempt", 3]);
//!
//! // Prebuilt pairs take a single slot
//! log!(logger, Pair::new("ok", true), "msg", "signed in");
//!
//! assert_eq!(buffer.contents(), "user=alice attempt=3 ok=true msg=\"signed in\"\n");
//! ```

/// Build a `Vec<Arg>` from heterogeneous keys, values and pairs.
///
/// # Examples
///
/// ```
/// use rust_kvlog::{args, Arg};
///
/// let list: Vec<Arg> = args!["status", 404, "elapsed", 0.25, "cached", false];
/// assert_eq!(list.len(), 6);
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

/// Log a record built from heterogeneous arguments.
///
/// With only a logger, submits the context and pending pairs.
///
/// # Examples
///
/// ```
/// # use rust_kvlog::Broker;
/// use rust_kvlog::log;
///
/// let broker = Broker::new();
/// let mut logger = broker.logger();
/// log!(logger, "msg", "started", "port", 8080);
/// log!(logger);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr) => {
        $logger.log_pending()
    };
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.log($crate::args![$($arg),+])
    };
}

/// Add call-site pairs to a logger's pending record.
///
/// # Examples
///
/// ```
/// # use rust_kvlog::Broker;
/// use rust_kvlog::here;
///
/// let broker = Broker::new();
/// let mut logger = broker.logger();
/// here!(logger);
/// assert_eq!(logger.pending()[0].key, "lineno");
/// ```
#[macro_export]
macro_rules! here {
    ($logger:expr) => {
        $logger.add_pairs($crate::location::what($crate::location::Parts::ALL))
    };
    ($logger:expr, $parts:expr) => {
        $logger.add_pairs($crate::location::what($parts))
    };
}
