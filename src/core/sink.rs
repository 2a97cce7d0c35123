//! Sinks: one destination's filter, redaction and formatting pipeline
//!
//! Each sink owns a worker thread that consumes a bounded queue in order.
//! A sink is created paused, toggles between paused and running with
//! [`Sink::start`] and [`Sink::stop`], and is closed exactly once.
//!
//! Every key carries at most one filter, either positive (the record must
//! satisfy it) or negative (the record is rejected when it holds). Setting
//! one classification for a key removes the other.

use super::broker::BrokerInner;
use super::destination::Destination;
use super::dispatch::{run_worker, Completion, Envelope};
use super::error::{ErrorCallback, LoggerError, Result};
use super::filter::{
    Filter, FilterKind, FloatRangeFilter, IntRangeFilter, KeyFilter, TimeRangeFilter,
    ValuesFilter,
};
use super::formatter::Formatter;
use super::metrics::SinkMetrics;
use super::record::Record;
use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub(crate) struct SinkState {
    pub(crate) destination: Option<Destination>,
    pub(crate) paused: bool,
    pub(crate) closed: bool,
    pub(crate) rules: Arc<Rules>,
}

impl SinkState {
    fn new(destination: Destination) -> Self {
        Self {
            destination: Some(destination),
            paused: true,
            closed: false,
            rules: Arc::new(Rules::default()),
        }
    }

    /// Copy-on-write access; a worker holding the previous rules keeps them
    fn rules_mut(&mut self) -> &mut Rules {
        Arc::make_mut(&mut self.rules)
    }
}

/// Filters and hidden keys of one sink
///
/// The worker clones the `Arc` and evaluates it with no lock held, so filters
/// and formatters may reconfigure or close their own sink.
#[derive(Clone, Default)]
pub(crate) struct Rules {
    positive: HashMap<String, Arc<dyn Filter>>,
    negative: HashMap<String, Arc<dyn Filter>>,
    pub(crate) hidden: HashSet<String>,
}

impl Rules {
    fn set_filter(&mut self, key: String, kind: FilterKind, filter: Arc<dyn Filter>) {
        match kind {
            FilterKind::Positive => {
                self.negative.remove(&key);
                self.positive.insert(key, filter);
            }
            FilterKind::Negative => {
                self.positive.remove(&key);
                self.negative.insert(key, filter);
            }
        }
    }

    fn clear_filter(&mut self, key: &str) {
        self.positive.remove(key);
        self.negative.remove(key);
    }

    fn filter_kind(&self, key: &str) -> Option<FilterKind> {
        if self.positive.contains_key(key) {
            Some(FilterKind::Positive)
        } else if self.negative.contains_key(key) {
            Some(FilterKind::Negative)
        } else {
            None
        }
    }

    /// Run the record's fields through the filters
    ///
    /// A negative filter that holds vetoes the record, so it is checked
    /// before the positive filter for the same key.
    pub(crate) fn admits(&self, record: &Record) -> bool {
        for field in record.fields() {
            if let Some(filter) = self.negative.get(field.key()) {
                if filter.check(field) {
                    return false;
                }
            }
            if let Some(filter) = self.positive.get(field.key()) {
                if !filter.check(field) {
                    return false;
                }
            }
        }
        true
    }
}

/// State shared between a sink handle and its worker thread
pub(crate) struct SinkCore {
    pub(crate) state: RwLock<SinkState>,
    pub(crate) formatter: Mutex<Box<dyn Formatter>>,
    pub(crate) metrics: SinkMetrics,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) label: String,
}

impl SinkCore {
    /// Drop everything a closed sink no longer needs
    pub(crate) fn release(&self) {
        let mut state = self.state.write();
        state.closed = true;
        state.destination = None;
        state.rules = Arc::new(Rules::default());
    }
}

struct SinkInner {
    core: Arc<SinkCore>,
    queue: Mutex<Option<Sender<Envelope>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    broker: Weak<BrokerInner>,
    shutdown_timeout: Duration,
}

/// Handle to a registered sink
///
/// Handles are cheap to clone and compare equal only when they refer to the
/// same sink.
///
/// # Example
///
/// ```
/// use rust_kvlog::{Broker, Destination, LogfmtFormatter};
///
/// let broker = Broker::new();
/// let (destination, buffer) = Destination::memory();
///
/// let sink = broker.sink_to(&destination, LogfmtFormatter::new());
/// sink.without_key(["debug"]).hide(["password"]).start();
///
/// let mut logger = broker.logger();
/// logger.log(["debug", "x", "msg", "skipped"]);
/// logger.log(["password", "hunter2", "msg", "hi"]);
///
/// assert_eq!(buffer.contents(), "msg=hi\n");
/// ```
#[derive(Clone)]
pub struct Sink {
    inner: Arc<SinkInner>,
}

impl Sink {
    pub(crate) fn spawn(
        destination: Destination,
        formatter: Box<dyn Formatter>,
        broker: &Arc<BrokerInner>,
    ) -> Result<Self> {
        let config = broker.config();
        if config.queue_capacity == 0 {
            return Err(LoggerError::config(
                "Sink",
                "queue capacity must be greater than zero",
            ));
        }

        let label = destination.label().to_string();
        let core = Arc::new(SinkCore {
            state: RwLock::new(SinkState::new(destination)),
            formatter: Mutex::new(formatter),
            metrics: SinkMetrics::new(),
            on_error: broker.on_error(),
            label: label.clone(),
        });

        let (sender, receiver) = crossbeam_channel::bounded(config.queue_capacity);
        let worker_core = Arc::clone(&core);
        let worker = thread::Builder::new()
            .name(format!("kvlog-sink-{}", label))
            .spawn(move || run_worker(worker_core, receiver))
            .map_err(LoggerError::WorkerSpawn)?;

        Ok(Self {
            inner: Arc::new(SinkInner {
                core,
                queue: Mutex::new(Some(sender)),
                worker: Mutex::new(Some(worker)),
                broker: Arc::downgrade(broker),
                shutdown_timeout: config.shutdown_timeout(),
            }),
        })
    }

    /// Apply `change` unless the sink is closed
    fn configure(&self, change: impl FnOnce(&mut SinkState)) -> &Self {
        let mut state = self.inner.core.state.write();
        if !state.closed {
            change(&mut state);
        }
        self
    }

    fn set_filters<I, S>(&self, keys: I, kind: FilterKind, filter: Arc<dyn Filter>) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configure(|state| {
            for key in keys {
                state
                    .rules_mut()
                    .set_filter(key.into(), kind, Arc::clone(&filter));
            }
        })
    }

    /// Only pass records that carry every listed key
    pub fn with_key<I, S>(&self, keys: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_filters(keys, FilterKind::Positive, Arc::new(KeyFilter))
    }

    /// Reject records that carry any listed key
    pub fn without_key<I, S>(&self, keys: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_filters(keys, FilterKind::Negative, Arc::new(KeyFilter))
    }

    /// Pass records whose `key` renders as one of `values`
    ///
    /// With no values this is [`Sink::with_key`].
    pub fn with_value<I, S>(&self, key: impl Into<String>, values: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = ValuesFilter::new(values);
        if filter.is_empty() {
            return self.with_key([key]);
        }
        self.set_filters([key], FilterKind::Positive, Arc::new(filter))
    }

    /// Reject records whose `key` renders as one of `values`
    ///
    /// With no values this is [`Sink::without_key`].
    pub fn without_value<I, S>(&self, key: impl Into<String>, values: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = ValuesFilter::new(values);
        if filter.is_empty() {
            return self.without_key([key]);
        }
        self.set_filters([key], FilterKind::Negative, Arc::new(filter))
    }

    pub fn with_int_range(&self, key: impl Into<String>, from: i64, to: i64) -> &Self {
        let filter = IntRangeFilter { from, to };
        self.set_filters([key], FilterKind::Positive, Arc::new(filter))
    }

    pub fn without_int_range(&self, key: impl Into<String>, from: i64, to: i64) -> &Self {
        let filter = IntRangeFilter { from, to };
        self.set_filters([key], FilterKind::Negative, Arc::new(filter))
    }

    pub fn with_float_range(&self, key: impl Into<String>, from: f64, to: f64) -> &Self {
        let filter = FloatRangeFilter { from, to };
        self.set_filters([key], FilterKind::Positive, Arc::new(filter))
    }

    pub fn without_float_range(&self, key: impl Into<String>, from: f64, to: f64) -> &Self {
        let filter = FloatRangeFilter { from, to };
        self.set_filters([key], FilterKind::Negative, Arc::new(filter))
    }

    pub fn with_time_range(
        &self,
        key: impl Into<String>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> &Self {
        let filter = TimeRangeFilter { from, to };
        self.set_filters([key], FilterKind::Positive, Arc::new(filter))
    }

    pub fn without_time_range(
        &self,
        key: impl Into<String>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> &Self {
        let filter = TimeRangeFilter { from, to };
        self.set_filters([key], FilterKind::Negative, Arc::new(filter))
    }

    /// Install a custom predicate as the positive filter for `key`
    pub fn with_filter(&self, key: impl Into<String>, filter: impl Filter + 'static) -> &Self {
        self.set_filters([key], FilterKind::Positive, Arc::new(filter))
    }

    /// Remove any filter for the listed keys
    pub fn reset<I, S>(&self, keys: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.configure(|state| {
            let rules = state.rules_mut();
            for key in keys {
                rules.clear_filter(key.as_ref());
            }
        })
    }

    /// Leave the listed keys out of the output; they still take part in filtering
    pub fn hide<I, S>(&self, keys: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configure(|state| {
            state
                .rules_mut()
                .hidden
                .extend(keys.into_iter().map(Into::into))
        })
    }

    pub fn unhide<I, S>(&self, keys: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.configure(|state| {
            let rules = state.rules_mut();
            for key in keys {
                rules.hidden.remove(key.as_ref());
            }
        })
    }

    /// Resume processing records
    pub fn start(&self) -> &Self {
        self.configure(|state| state.paused = false)
    }

    /// Pause the sink; records reaching a paused sink are dropped
    pub fn stop(&self) -> &Self {
        self.configure(|state| state.paused = true)
    }

    /// Block until every record queued before this call has been classified
    pub fn flush(&self) -> &Self {
        let Some(queue) = self.queue() else {
            return self;
        };

        let (done, tickets) = Completion::with_tickets(1);
        for ticket in tickets {
            // A disconnected queue hands the envelope back; dropping it releases the ticket.
            let _ = queue.send(Envelope::flush(ticket));
        }
        drop(queue);
        done.wait();
        self
    }

    /// Close the sink and detach it from its broker
    ///
    /// Entries still queued are released without being formatted. Waits for
    /// the worker to exit, up to the broker's shutdown timeout. Closing twice
    /// is a no-op.
    pub fn close(&self) {
        {
            let mut state = self.inner.core.state.write();
            if state.closed {
                return;
            }
            state.closed = true;
            state.destination = None;
        }

        if let Some(broker) = self.inner.broker.upgrade() {
            broker.remove(self);
        }

        drop(self.inner.queue.lock().take());
        self.join_worker();
    }

    fn join_worker(&self) {
        let Some(handle) = self.inner.worker.lock().take() else {
            return;
        };

        // Closing from a filter, formatter or error callback runs on the worker itself.
        if handle.thread().id() == thread::current().id() {
            return;
        }

        let timeout = self.inner.shutdown_timeout;
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    eprintln!(
                        "[KVLOG WARNING] Worker for sink {} panicked during shutdown",
                        self.inner.core.label
                    );
                }
                return;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[KVLOG WARNING] Worker for sink {} did not exit within {:?}",
                    self.inner.core.label, timeout
                );
                return;
            }

            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Current position in the broker's registry; `None` once closed
    pub fn id(&self) -> Option<usize> {
        self.inner.broker.upgrade()?.position_of(self)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.core.state.read().paused
    }

    pub fn is_closed(&self) -> bool {
        self.inner.core.state.read().closed
    }

    pub fn filter_kind(&self, key: &str) -> Option<FilterKind> {
        self.inner.core.state.read().rules.filter_kind(key)
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.inner.core.state.read().rules.hidden.contains(key)
    }

    pub fn formatter_name(&self) -> String {
        self.inner.core.formatter.lock().name().to_string()
    }

    pub fn label(&self) -> &str {
        &self.inner.core.label
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.inner.core.metrics
    }

    /// True if this live sink writes to `destination`
    pub(crate) fn targets(&self, destination: &Destination) -> bool {
        self.inner
            .core
            .state
            .read()
            .destination
            .as_ref()
            .is_some_and(|current| current.same_as(destination))
    }

    pub(crate) fn replace_formatter(&self, formatter: Box<dyn Formatter>) {
        *self.inner.core.formatter.lock() = formatter;
    }

    fn queue(&self) -> Option<Sender<Envelope>> {
        self.inner.queue.lock().clone()
    }

    /// Queue handle if the sink should receive new records right now
    pub(crate) fn active_queue(&self) -> Option<Sender<Envelope>> {
        let state = self.inner.core.state.read();
        if state.closed || state.paused {
            return None;
        }
        self.queue()
    }
}

impl PartialEq for Sink {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Sink {}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.core.state.read();
        f.debug_struct("Sink")
            .field("label", &self.inner.core.label)
            .field("paused", &state.paused)
            .field("closed", &state.closed)
            .field("hidden", &state.rules.hidden.len())
            .finish_non_exhaustive()
    }
}
