//! Basic broker and logger usage
//!
//! Demonstrates a logfmt sink on stdout, context pairs, pending pairs and
//! call-site pairs.
//!
//! Run with: cargo run --example basic_usage

use rust_kvlog::prelude::*;

fn main() -> Result<()> {
    println!("=== rust_kvlog - Basic Usage Example ===\n");

    let broker = Broker::builder()
        .time_format(TimestampFormat::Iso8601)
        .try_build()?;

    let stdout = broker.sink_to(&Destination::stdout(), LogfmtFormatter::new().with_colors(true));
    stdout.start();

    let mut logger = broker.logger();
    logger.with(["service", "basic-demo", "version", "0.1.0"]);

    println!("1. Plain records:");
    logger.log(["msg", "application started"]);
    log!(logger, "msg", "listening", "port", 8080, "tls", false);

    println!("\n2. Typed values:");
    log!(
        logger,
        "pi", 3.1415,
        "started_at", chrono::Utc::now(),
        "tags", vec!["alpha", "beta"]
    );

    println!("\n3. Pending pairs collected across steps:");
    logger.add(["step", "load-config"]);
    logger.add(args!["files", 3]);
    logger.log(["msg", "configuration loaded"]);

    println!("\n4. Caller information:");
    here!(logger);
    logger.log(["msg", "where am I?"]);

    println!("\n5. Same destination, new formatter:");
    broker.sink_to(&Destination::stdout(), JsonFormatter::new());
    logger.log(["msg", "now in JSON"]);

    broker.close_all();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
