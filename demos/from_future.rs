//! Demonstration of exposing a future's result as a derivable

use futures::executor::LocalPool;
use std::io;
use tincan_flow::{from_future, DerivableExt, ReactiveError};

fn main() -> Result<(), ReactiveError> {
    println!("=== From Future Example ===\n");

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let answer = from_future(&spawner, async { Ok::<_, io::Error>(15) })?;
    let total = answer.map(|v| v + 27);
    let failed = from_future(&spawner, async {
        Err::<i32, _>(io::Error::other("connection refused"))
    })?;

    println!("1. Before polling");
    println!("   total resolved: {}", total.resolved());

    pool.run_until_stalled();

    println!("\n2. After polling");
    println!("   total: {:?}", total.value());
    println!("   failed: {:?}", failed.error());
    Ok(())
}
