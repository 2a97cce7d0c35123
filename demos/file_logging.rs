//! File logging example
//!
//! Writes logfmt to one file and JSON Lines to another, with the broker
//! configured from JSON.
//!
//! Run with: cargo run --example file_logging

use rust_kvlog::prelude::*;

fn main() -> Result<()> {
    println!("=== rust_kvlog - File Logging Example ===\n");

    let config = BrokerConfig::from_json(
        r#"{ "queue_capacity": 64, "time_format": "UnixMillis", "shutdown_timeout_ms": 2000 }"#,
    )?;
    let broker = Broker::with_config(config)?;

    let text = broker.sink_to(&Destination::file("application.log")?, LogfmtFormatter::new());
    let json = broker.sink_to(&Destination::file("application.jsonl")?, JsonFormatter::new());
    text.start();
    json.hide(["trace_id"]).start();

    let mut logger = broker.logger();
    logger.with(["app", "file-demo", "trace_id", "7f3a9c"]);

    println!("1. Logging application lifecycle:");
    logger.log(args!["msg", "application started", "at", chrono::Utc::now()]);
    logger.log(["msg", "configuration loaded"]);

    println!("2. Processing items:");
    for i in 1..=5 {
        logger.add(args!["item", i, "of", 5]);
        if i == 3 {
            logger.add(["slow", "true"]);
        }
        logger.log(["msg", "processed"]);
    }

    logger.log(["msg", "all operations completed"]);
    broker.close_all();

    println!("\n=== Example completed successfully! ===");
    println!("Check 'application.log' and 'application.jsonl' for the output");

    Ok(())
}
