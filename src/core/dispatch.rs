//! Sink worker loop and completion signalling
//!
//! Every envelope carries one [`Ticket`] of a [`Completion`] latch. The
//! latch reaches zero when all tickets are gone, whether they were signalled
//! after processing or dropped together with an envelope that a closed sink
//! never looked at. A producer waiting on the latch therefore cannot outlive
//! the sinks it targeted.

use super::error::LoggerError;
use super::record::Record;
use super::sink::{Rules, SinkCore};
use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug)]
struct Latch {
    remaining: Mutex<usize>,
    zero: Condvar,
}

/// Countdown shared by every envelope of one submission
#[derive(Debug)]
pub(crate) struct Completion {
    latch: Arc<Latch>,
}

/// One share of a [`Completion`]; counts down when dropped
#[derive(Debug)]
#[must_use = "dropping a ticket counts its completion down"]
pub(crate) struct Ticket {
    latch: Arc<Latch>,
}

impl Completion {
    /// A latch pre-counted to `count`, with exactly `count` tickets
    pub(crate) fn with_tickets(count: usize) -> (Self, Vec<Ticket>) {
        let latch = Arc::new(Latch {
            remaining: Mutex::new(count),
            zero: Condvar::new(),
        });
        let tickets = (0..count)
            .map(|_| Ticket {
                latch: Arc::clone(&latch),
            })
            .collect();
        (Self { latch }, tickets)
    }

    /// Block until every ticket has been signalled or dropped
    pub(crate) fn wait(&self) {
        let mut remaining = self.latch.remaining.lock();
        while *remaining > 0 {
            self.latch.zero.wait(&mut remaining);
        }
    }
}

impl Ticket {
    /// Consume the ticket; the count-down happens in `Drop`
    #[inline]
    pub(crate) fn signal(self) {}
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut remaining = self.latch.remaining.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.latch.zero.notify_all();
        }
    }
}

/// Dispatch entry; a missing record marks a flush request
#[derive(Debug)]
pub(crate) struct Envelope {
    record: Option<Arc<Record>>,
    ticket: Ticket,
}

impl Envelope {
    pub(crate) fn record(record: Arc<Record>, ticket: Ticket) -> Self {
        Self {
            record: Some(record),
            ticket,
        }
    }

    pub(crate) fn flush(ticket: Ticket) -> Self {
        Self {
            record: None,
            ticket,
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

enum Outcome {
    Filtered,
    Closed,
    Written(io::Result<()>),
}

/// Body of a sink's worker thread
///
/// Consumes the queue in order until the sink is closed or every sender is
/// gone, then releases the sink's filter and redaction state.
pub(crate) fn run_worker(core: Arc<SinkCore>, queue: Receiver<Envelope>) {
    for envelope in queue.iter() {
        if let Flow::Stop = core.process(envelope) {
            break;
        }
    }

    // Whatever is still queued is released unformatted.
    for envelope in queue.try_iter() {
        core.metrics.record_skipped_closed();
        envelope.ticket.signal();
    }

    core.release();
}

impl SinkCore {
    fn process(&self, envelope: Envelope) -> Flow {
        let Envelope { record, ticket } = envelope;

        let Some(record) = record else {
            self.metrics.record_flush();
            ticket.signal();
            return Flow::Continue;
        };

        // No sink lock is held past this block: filters, formatters and the
        // error callback may call back into their own sink.
        let (destination, rules) = {
            let state = self.state.read();
            if state.closed {
                self.metrics.record_skipped_closed();
                ticket.signal();
                return Flow::Stop;
            }
            if state.paused {
                self.metrics.record_skipped_paused();
                ticket.signal();
                return Flow::Continue;
            }
            let Some(ref destination) = state.destination else {
                self.metrics.record_skipped_closed();
                ticket.signal();
                return Flow::Stop;
            };
            (destination.clone(), Arc::clone(&state.rules))
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if !rules.admits(&record) {
                return Outcome::Filtered;
            }
            // A filter may have closed the sink.
            if self.state.read().closed {
                return Outcome::Closed;
            }
            let bytes = self.format(&rules, &record);
            Outcome::Written(destination.write_record(&bytes))
        }));

        let flow = match outcome {
            Ok(Outcome::Filtered) => {
                self.metrics.record_filtered();
                Flow::Continue
            }
            Ok(Outcome::Closed) => {
                self.metrics.record_skipped_closed();
                Flow::Stop
            }
            Ok(Outcome::Written(Ok(()))) => {
                self.metrics.record_written();
                Flow::Continue
            }
            Ok(Outcome::Written(Err(e))) => {
                self.metrics.record_write_error();
                self.report(LoggerError::io_operation(
                    "writing record",
                    format!("destination {} rejected the record", self.label),
                    e,
                ));
                Flow::Continue
            }
            Err(panic_info) => {
                self.metrics.record_panic();
                let error = LoggerError::sink_panicked(&self.label, panic_message(&panic_info));
                match self.on_error {
                    Some(ref callback) => callback(&error),
                    None => eprintln!(
                        "[KVLOG CRITICAL] {}. Other sinks continue to function.",
                        error
                    ),
                }
                Flow::Continue
            }
        };

        ticket.signal();
        flow
    }

    /// Render the visible fields of `record`
    fn format(&self, rules: &Rules, record: &Record) -> Vec<u8> {
        let mut formatter = self.formatter.lock();
        formatter.begin();
        for field in record.fields() {
            if !rules.hidden.contains(field.key()) {
                formatter.pair(field);
            }
        }
        formatter.finish()
    }

    fn report(&self, error: LoggerError) {
        if let Some(ref callback) = self.on_error {
            callback(&error);
        }
    }
}

fn panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
