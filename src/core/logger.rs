//! Logger: context pairs, pending pairs and record submission

use super::broker::Broker;
use super::pair::{flatten, Arg, Pair};
use super::record::Record;
use std::fmt;

/// Producer of records
///
/// A logger carries persistent context pairs and pending pairs for the next
/// record. Mutators take `&mut self`; share loggers between threads by
/// [`Logger::fork`]ing them.
///
/// # Example
///
/// ```
/// use rust_kvlog::{args, Broker, Destination, LogfmtFormatter};
///
/// let broker = Broker::new();
/// let (destination, buffer) = Destination::memory();
/// broker.sink_to(&destination, LogfmtFormatter::new()).start();
///
/// let mut logger = broker.logger();
/// logger.with(args!["request", 17]);
/// logger.add(args!["step", "auth"]);
/// logger.log(args!["ok", true, "ratio", 0.5]);
///
/// assert_eq!(buffer.contents(), "request=17 step=auth ok=true ratio=5e-01\n");
/// ```
#[derive(Clone)]
pub struct Logger {
    broker: Broker,
    context: Vec<Pair>,
    pending: Vec<Pair>,
}

impl Logger {
    pub fn new(broker: &Broker) -> Self {
        Self {
            broker: broker.clone(),
            context: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Set context pairs carried by every record from this logger
    ///
    /// A key already in the context gets the new value in place. A trailing
    /// key without a value is ignored.
    pub fn with<I, A>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        for pair in flatten(args) {
            match self.context.iter_mut().find(|p| p.key == pair.key) {
                Some(existing) => *existing = pair,
                None => self.context.push(pair),
            }
        }
        self
    }

    /// Remove context keys
    pub fn without<I, S>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.context.retain(|p| p.key != key.as_ref());
        }
        self
    }

    /// Append pairs to the next record only
    pub fn add<I, A>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.pending.extend(flatten(args));
        self
    }

    /// Append prebuilt pairs to the next record
    pub fn add_pairs(&mut self, pairs: impl IntoIterator<Item = Pair>) -> &mut Self {
        self.pending.extend(pairs);
        self
    }

    /// Discard pending pairs
    pub fn reset(&mut self) -> &mut Self {
        self.pending.clear();
        self
    }

    /// An independent logger with a copy of this logger's context
    pub fn fork(&self) -> Logger {
        Self {
            broker: self.broker.clone(),
            context: self.context.clone(),
            pending: Vec::new(),
        }
    }

    pub fn context(&self) -> &[Pair] {
        &self.context
    }

    pub fn pending(&self) -> &[Pair] {
        &self.pending
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Merge context, pending pairs and `args` into one record and submit it
    ///
    /// Blocks until every sink that was running at submission has classified
    /// the record. Pending pairs are cleared. A record with no pairs at all
    /// is not submitted.
    pub fn log<I, A>(&mut self, args: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let last = flatten(args);
        let record = Record::from_pairs(
            self.context.iter().chain(&self.pending).chain(&last),
            self.broker.time_format(),
        );
        self.pending.clear();

        if !record.is_empty() {
            self.broker.broadcast(record);
        }
    }

    /// Submit context and pending pairs with no further arguments
    pub fn log_pending(&mut self) {
        self.log(Vec::<Arg>::new());
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("context", &self.context)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
