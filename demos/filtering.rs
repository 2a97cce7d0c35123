//! Per-sink filtering and redaction
//!
//! Two sinks share one logger: stdout receives everything except debug
//! records with passwords hidden, stderr only receives server errors.
//!
//! Run with: cargo run --example filtering

use rust_kvlog::prelude::*;
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== rust_kvlog - Filtering Example ===\n");

    let broker = Broker::builder()
        .on_error(Arc::new(|err: &LoggerError| eprintln!("sink failure: {}", err)))
        .try_build()?;

    let everything = broker.sink_to(&Destination::stdout(), LogfmtFormatter::new());
    everything.without_key(["debug"]).hide(["password"]).start();

    let errors = broker.sink_to(&Destination::stderr(), JsonFormatter::new());
    errors
        .with_int_range("status", 499, 600)
        .with_filter("path", |field: &Field| field.text().starts_with("/api/"))
        .start();

    let mut logger = broker.logger();
    logger.with(["service", "gateway"]);

    log!(logger, "path", "/api/orders", "status", 200, "msg", "ok");
    log!(logger, "path", "/api/orders", "status", 503, "msg", "upstream timeout");
    log!(logger, "path", "/health", "status", 500, "msg", "probe failed");
    log!(logger, "debug", true, "msg", "cache warmed");
    log!(logger, "user", "alice", "password", "hunter2", "msg", "signed in");

    println!("\nPausing stdout sink; the next record is dropped there.");
    everything.stop();
    log!(logger, "path", "/api/pay", "status", 502, "msg", "while paused");
    everything.start();

    broker.flush();
    for sink in broker.sinks() {
        let metrics = sink.metrics();
        println!(
            "sink {} ({}): written={} filtered={} rate={:.1}%",
            sink.label(),
            sink.formatter_name(),
            metrics.written(),
            metrics.filtered(),
            metrics.filter_rate()
        );
    }

    broker.close_all();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
