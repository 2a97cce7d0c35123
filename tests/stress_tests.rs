//! Stress tests for concurrent dispatch
//!
//! These tests verify:
//! - Every record from many concurrent loggers reaches every running sink
//! - Each sink keeps the per-producer submission order
//! - A slow destination throttles producers without losing records
//! - Reconfiguring, registering and closing sinks while logging never deadlocks

use rust_kvlog::{args, Broker, Destination, JsonFormatter, LogfmtFormatter};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const THREADS: usize = 8;
const RECORDS_PER_THREAD: usize = 200;

fn parse_logfmt(line: &str) -> HashMap<String, String> {
    line.split(' ')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_concurrent_loggers_reach_every_sink_in_order() {
    let broker = Broker::new();
    let (text_destination, text) = Destination::memory();
    let (json_destination, json) = Destination::memory();
    broker.sink_to(&text_destination, LogfmtFormatter::new()).start();
    broker.sink_to(&json_destination, JsonFormatter::new()).start();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let mut logger = broker.logger();
            logger.with(args!["thread", t]);
            thread::spawn(move || {
                for seq in 0..RECORDS_PER_THREAD {
                    logger.log(args!["seq", seq]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer panicked");
    }

    let lines = text.lines();
    assert_eq!(lines.len(), THREADS * RECORDS_PER_THREAD);
    assert_eq!(json.lines().len(), THREADS * RECORDS_PER_THREAD);

    let mut next_seq: HashMap<String, usize> = HashMap::new();
    for line in &lines {
        let fields = parse_logfmt(line);
        let thread_id = fields["thread"].clone();
        let seq: usize = fields["seq"].parse().unwrap();

        let expected = next_seq.entry(thread_id).or_insert(0);
        assert_eq!(seq, *expected, "out of order record: {}", line);
        *expected += 1;
    }
}

/// Writer that sleeps on every write
struct SlowWriter {
    delay: Duration,
    lines: Arc<parking_lot::Mutex<usize>>,
}

impl Write for SlowWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        thread::sleep(self.delay);
        *self.lines.lock() += buf.iter().filter(|b| **b == b'\n').count();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_slow_destination_applies_backpressure() {
    let broker = Broker::builder().queue_capacity(1).build();
    let lines = Arc::new(parking_lot::Mutex::new(0));
    let slow = Destination::new(SlowWriter {
        delay: Duration::from_millis(2),
        lines: Arc::clone(&lines),
    });
    let (fast_destination, fast) = Destination::memory();

    let slow_sink = broker.sink_to(&slow, LogfmtFormatter::new());
    slow_sink.start();
    broker.sink_to(&fast_destination, LogfmtFormatter::new()).start();

    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let mut logger = broker.logger();
            thread::spawn(move || {
                for seq in 0..25 {
                    logger.log(args!["t", t, "seq", seq]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }

    // 100 records at 2ms each on a single worker
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(*lines.lock(), 100);
    assert_eq!(fast.lines().len(), 100);
    assert_eq!(slow_sink.metrics().written(), 100);
}

#[test]
fn test_reconfigure_while_logging() {
    let broker = Broker::new();
    let (destination, buffer) = Destination::memory();
    let sink = broker.sink_to(&destination, LogfmtFormatter::new());
    sink.start();

    let stop = Arc::new(AtomicBool::new(false));

    let mutator = {
        let sink = sink.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut round = 0u64;
            while !stop.load(Ordering::Relaxed) {
                match round % 4 {
                    0 => sink.without_key(["noise"]),
                    1 => sink.with_int_range("seq", -1, 1_000_000),
                    2 => sink.hide(["secret"]).stop(),
                    _ => sink.reset(["noise", "seq"]).unhide(["secret"]).start(),
                };
                round += 1;
            }
        })
    };

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let mut logger = broker.logger();
            thread::spawn(move || {
                for seq in 0..300 {
                    logger.log(args!["t", t, "seq", seq, "secret", "x"]);
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().expect("producer panicked");
    }
    stop.store(true, Ordering::Relaxed);
    mutator.join().expect("mutator panicked");

    sink.start().flush();
    assert_eq!(sink.metrics().written(), buffer.lines().len() as u64);
    assert!(buffer
        .lines()
        .iter()
        .all(|line| line.starts_with("t=") && line.contains(" seq=")));
}

#[test]
fn test_register_and_close_while_logging() {
    let broker = Broker::new();
    let (_keeper, kept) = {
        let (destination, buffer) = Destination::memory();
        let sink = broker.sink_to(&destination, LogfmtFormatter::new());
        sink.start();
        (sink, buffer)
    };

    let churn = {
        let broker = broker.clone();
        thread::spawn(move || {
            for _ in 0..50 {
                let (destination, _) = Destination::memory();
                let sink = broker.sink_to(&destination, LogfmtFormatter::new());
                sink.start();
                thread::sleep(Duration::from_micros(200));
                sink.close();
            }
        })
    };

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let mut logger = broker.logger();
            thread::spawn(move || {
                for seq in 0..200 {
                    logger.log(args!["t", t, "seq", seq]);
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().expect("producer panicked");
    }
    churn.join().expect("churn thread panicked");

    assert_eq!(kept.lines().len(), 800);
    assert_eq!(broker.sink_count(), 1);
}

#[test]
fn test_concurrent_flushes() {
    let broker = Broker::new();
    let (destination, buffer) = Destination::memory();
    let sink = broker.sink_to(&destination, LogfmtFormatter::new());
    sink.start();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let sink = sink.clone();
            let mut logger = broker.logger();
            thread::spawn(move || {
                for seq in 0..50 {
                    logger.log(args!["t", t, "seq", seq]);
                    if seq % 10 == 0 {
                        sink.flush();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer panicked");
    }

    assert_eq!(buffer.lines().len(), THREADS * 50);
    assert_eq!(sink.metrics().flushes(), (THREADS * 5) as u64);
}
