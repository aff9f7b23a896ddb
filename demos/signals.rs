//! Demonstration of signals, memos and reactors

use tincan_flow::{
    create_memo, create_signal, Derivable, DerivableExt, ErrorValue, Memo, ReactorOptions, Signal,
};

fn main() {
    println!("=== Signals Example ===\n");

    println!("1. Creating signals and a derived sum");
    let a = create_signal(5);
    let b = create_signal(10);
    let sum = create_memo({
        let a = a.clone();
        let b = b.clone();
        move || a.value().unwrap_or_default() + b.value().unwrap_or_default()
    });
    println!("   {:?} + {:?} = {:?}", a.value(), b.value(), sum.value());

    a.set(20);
    println!("   {:?} + {:?} = {:?}", a.value(), b.value(), sum.value());

    println!("\n2. Unresolved and errored states");
    let input: Signal<i32> = Signal::unresolved();
    let doubled = Memo::try_new({
        let input = input.clone();
        move || Ok(input.get()? * 2)
    });
    println!("   before input: {:?}", doubled.get_state());
    input.set_error(ErrorValue::msg("sensor offline"));
    println!("   after error: {:?}", doubled.get_state());
    input.set(21);
    println!("   after value: {:?}", doubled.get_state());

    println!("\n3. Reacting to changes");
    let counter = Signal::new(0);
    let stopper = counter.react(
        |value, _| println!("   counter is now {value}"),
        ReactorOptions::new().skip_first(true),
    );
    for _ in 0..3 {
        counter.update(|n| *n += 1);
    }
    stopper.stop();
    counter.set(100);
    println!("   stopped, counter is {:?}", counter.value());
}
