//! Broker: the registry of live sinks
//!
//! A broker owns an ordered list of sinks and fans records out to them.
//! Brokers are independent of each other; cloning a [`Broker`] yields
//! another handle to the same registry.

use super::destination::Destination;
use super::dispatch::{Completion, Envelope};
use super::error::{ErrorCallback, LoggerError, Result};
use super::formatter::Formatter;
use super::logger::Logger;
use super::record::Record;
use super::sink::Sink;
use super::timestamp::TimestampFormat;
use crossbeam_channel::Sender;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default capacity of each sink's input queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Default time `Sink::close` waits for a worker thread to exit
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Broker settings
///
/// # Example
///
/// ```
/// use rust_kvlog::BrokerConfig;
///
/// let config = BrokerConfig::from_json(r#"{ "queue_capacity": 64 }"#).unwrap();
/// assert_eq!(config.queue_capacity, 64);
/// assert_eq!(config.shutdown_timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Capacity of each sink's bounded queue
    pub queue_capacity: usize,

    /// Rendering of time values
    pub time_format: TimestampFormat,

    /// Upper bound on waiting for a sink worker during close
    pub shutdown_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            time_format: TimestampFormat::default(),
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
        }
    }
}

impl BrokerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "Broker",
                "queue_capacity must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) struct BrokerInner {
    sinks: RwLock<Vec<Sink>>,
    config: BrokerConfig,
    on_error: Option<ErrorCallback>,
}

impl BrokerInner {
    pub(crate) fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub(crate) fn on_error(&self) -> Option<ErrorCallback> {
        self.on_error.clone()
    }

    pub(crate) fn remove(&self, sink: &Sink) {
        self.sinks.write().retain(|registered| registered != sink);
    }

    pub(crate) fn position_of(&self, sink: &Sink) -> Option<usize> {
        self.sinks
            .read()
            .iter()
            .position(|registered| registered == sink)
    }
}

impl Drop for BrokerInner {
    fn drop(&mut self) {
        for sink in self.sinks.get_mut().drain(..) {
            sink.close();
        }
    }
}

/// Registry of sinks and source of loggers
///
/// # Example
///
/// ```
/// use rust_kvlog::{Broker, Destination, LogfmtFormatter};
///
/// let broker = Broker::new();
/// let (destination, buffer) = Destination::memory();
/// broker.sink_to(&destination, LogfmtFormatter::new()).start();
///
/// let mut logger = broker.logger();
/// logger.with(["service", "billing"]);
/// logger.log(["msg", "invoice sent", "amount", "42"]);
///
/// assert_eq!(buffer.contents(), "service=billing msg=\"invoice sent\" amount=42\n");
/// ```
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    pub fn new() -> Self {
        BrokerBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::new()
    }

    pub fn with_config(config: BrokerConfig) -> Result<Self> {
        BrokerBuilder::new().config(config).try_build()
    }

    /// A new, empty logger feeding this broker
    pub fn logger(&self) -> Logger {
        Logger::new(self)
    }

    /// Register `formatter` for `destination`
    ///
    /// If a live sink already writes to this destination, its formatter is
    /// replaced and that sink is returned with its filters and hidden keys
    /// intact. Otherwise a new paused sink is created.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread for a new sink cannot be spawned. Use
    /// [`Broker::try_sink_to`] to handle that case.
    pub fn sink_to<F>(&self, destination: &Destination, formatter: F) -> Sink
    where
        F: Formatter + 'static,
    {
        match self.try_sink_to(destination, formatter) {
            Ok(sink) => sink,
            Err(e) => panic!("failed to register sink for {}: {}", destination.label(), e),
        }
    }

    pub fn try_sink_to<F>(&self, destination: &Destination, formatter: F) -> Result<Sink>
    where
        F: Formatter + 'static,
    {
        let mut sinks = self.inner.sinks.write();

        if let Some(existing) = sinks.iter().find(|sink| sink.targets(destination)).cloned() {
            // The worker may hold the formatter lock while closing a sink.
            drop(sinks);
            existing.replace_formatter(Box::new(formatter));
            return Ok(existing);
        }

        let sink = Sink::spawn(destination.clone(), Box::new(formatter), &self.inner)?;
        sinks.push(sink.clone());
        Ok(sink)
    }

    /// Snapshot of the registered sinks in registration order
    pub fn sinks(&self) -> Vec<Sink> {
        self.inner.sinks.read().clone()
    }

    pub fn sink_count(&self) -> usize {
        self.inner.sinks.read().len()
    }

    pub fn flush(&self) {
        for sink in self.sinks() {
            sink.flush();
        }
    }

    pub fn close_all(&self) {
        for sink in self.sinks() {
            sink.close();
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    pub fn time_format(&self) -> &TimestampFormat {
        &self.inner.config.time_format
    }

    /// Hand `record` to every active sink and wait until each has classified it
    pub(crate) fn broadcast(&self, record: Record) {
        let targets: Vec<Sender<Envelope>> = {
            let sinks = self.inner.sinks.read();
            sinks.iter().filter_map(Sink::active_queue).collect()
        };

        if targets.is_empty() {
            return;
        }

        let record = Arc::new(record);
        let (done, tickets) = Completion::with_tickets(targets.len());
        for (queue, ticket) in targets.into_iter().zip(tickets) {
            // Sending blocks while the sink's queue is full.
            let _ = queue.send(Envelope::record(Arc::clone(&record), ticket));
        }
        done.wait();
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.inner.config)
            .field("sinks", &self.sink_count())
            .finish_non_exhaustive()
    }
}

/// Builder for Broker with fluent API
///
/// # Example
/// ```
/// use rust_kvlog::{Broker, LoggerError, TimestampFormat};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let broker = Broker::builder()
///     .queue_capacity(64)
///     .time_format(TimestampFormat::UnixMillis)
///     .shutdown_timeout(Duration::from_secs(1))
///     .on_error(Arc::new(|err: &LoggerError| eprintln!("sink failure: {}", err)))
///     .build();
///
/// assert_eq!(broker.config().queue_capacity, 64);
/// ```
pub struct BrokerBuilder {
    config: BrokerConfig,
    on_error: Option<ErrorCallback>,
}

impl BrokerBuilder {
    pub fn new() -> Self {
        Self {
            config: BrokerConfig::default(),
            on_error: None,
        }
    }

    /// Replace all settings at once
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: BrokerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn time_format(mut self, format: TimestampFormat) -> Self {
        self.config.time_format = format;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set a callback for sink write failures and panics
    ///
    /// The callback runs on the sink's worker thread.
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Build the Broker, rejecting invalid settings
    pub fn try_build(self) -> Result<Broker> {
        self.config.validate()?;
        Ok(self.finish())
    }

    /// Build the Broker
    ///
    /// A zero queue capacity is raised to one; [`BrokerBuilder::try_build`]
    /// rejects it instead.
    pub fn build(mut self) -> Broker {
        self.config.queue_capacity = self.config.queue_capacity.max(1);
        self.finish()
    }

    fn finish(self) -> Broker {
        Broker {
            inner: Arc::new(BrokerInner {
                sinks: RwLock::new(Vec::new()),
                config: self.config,
                on_error: self.on_error,
            }),
        }
    }
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::{JsonFormatter, LogfmtFormatter};

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.time_format, TimestampFormat::Rfc3339);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_try_build_rejects_zero_capacity() {
        let err = Broker::builder().queue_capacity(0).try_build().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let broker = Broker::builder().queue_capacity(0).build();
        assert_eq!(broker.config().queue_capacity, 1);
    }

    #[test]
    fn test_config_json() {
        let config = BrokerConfig {
            queue_capacity: 8,
            time_format: TimestampFormat::Unix,
            shutdown_timeout_ms: 250,
        };

        let json = config.to_json().unwrap();
        assert_eq!(BrokerConfig::from_json(&json).unwrap(), config);

        assert!(matches!(
            BrokerConfig::from_json("{ not json"),
            Err(LoggerError::JsonError(_))
        ));
        assert!(matches!(
            BrokerConfig::from_json(r#"{ "queue_capacity": 0 }"#),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_same_destination_same_sink() {
        let broker = Broker::new();
        let (destination, _) = Destination::memory();

        let first = broker.sink_to(&destination, LogfmtFormatter::new());
        first.with_key(["user"]);
        let second = broker.sink_to(&destination, JsonFormatter::new());

        assert_eq!(first, second);
        assert_eq!(broker.sink_count(), 1);
        assert_eq!(second.formatter_name(), "json");
        assert!(second.filter_kind("user").is_some());
    }

    #[test]
    fn test_positional_ids_shift_on_close() {
        let broker = Broker::new();
        let sinks: Vec<Sink> = (0..3)
            .map(|_| {
                let (destination, _) = Destination::memory();
                broker.sink_to(&destination, LogfmtFormatter::new())
            })
            .collect();

        assert_eq!(sinks[2].id(), Some(2));
        sinks[0].close();
        assert_eq!(sinks[1].id(), Some(0));
        assert_eq!(sinks[2].id(), Some(1));
        assert_eq!(sinks[0].id(), None);
    }

    #[test]
    fn test_independent_brokers() {
        let a = Broker::new();
        let b = Broker::new();
        let (destination, _) = Destination::memory();

        a.sink_to(&destination, LogfmtFormatter::new());
        assert_eq!(a.sink_count(), 1);
        assert_eq!(b.sink_count(), 0);
    }

    #[test]
    fn test_close_all_and_drop() {
        let broker = Broker::new();
        let (destination, _) = Destination::memory();
        let sink = broker.sink_to(&destination, LogfmtFormatter::new());

        broker.close_all();
        assert!(sink.is_closed());
        assert_eq!(broker.sink_count(), 0);

        let (destination, _) = Destination::memory();
        let sink = broker.sink_to(&destination, LogfmtFormatter::new());
        drop(broker);
        assert!(sink.is_closed());
    }
}
