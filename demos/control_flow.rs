//! Demonstration of gating a derivable with control-flow options
//!
//! Run with `RUST_LOG=tincan_flow=trace` to see updates being forwarded.

use tincan_flow::{transaction, Condition, ControlFlowOptions, DerivableExt, DerivableRef, Signal};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    println!("=== Control Flow Example ===\n");

    let reading = Signal::new(20);

    // when: only follow the sensor while monitoring is enabled
    println!("1. Following a sensor only while monitoring is on");
    let monitoring = Signal::new(true);
    let monitored = reading.control_flow(ControlFlowOptions::new().when(monitoring.clone()));
    let _monitored_guard = monitored.watch(|value| println!("   monitored: {value}"));

    monitoring.set(false);
    reading.set(21);
    reading.set(22);
    println!("   monitoring paused, still showing {:?}", monitored.value());
    monitoring.set(true);

    // once: capture the first reading only
    println!("\n2. Capturing the first reading");
    let first = reading.control_flow(ControlFlowOptions::new().once(true));
    let _first_guard = first.watch(|value| println!("   first: {value}"));
    reading.set(23);
    println!("   first reading stays {:?}", first.value());

    // skip_first + until: follow changes from now on, until an alarm trips
    println!("\n3. Following changes until the alarm trips");
    let changes = reading.control_flow(
        ControlFlowOptions::new()
            .skip_first(true)
            .until_fn(|source: &DerivableRef<i32>| Condition::from(source.map(|v| v > 30))),
    );
    let _changes_guard = changes.watch(|value| println!("   changed: {value}"));
    for value in [25, 28, 35, 24] {
        reading.set(value);
    }
    println!("   stopped at {:?} after {} updates", changes.value(), changes.version());

    // transactions: reads see uncommitted changes, reactors run once
    println!("\n4. Batching changes in a transaction");
    transaction(|| {
        reading.set(26);
        reading.set(27);
        println!("   inside the transaction: {:?}", monitored.value());
    });
}
