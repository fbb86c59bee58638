use std::sync::Arc;
use std::thread;

use tether::state::State;

/// Writing the current value again publishes nothing.
#[test]
fn test_setting_equal_value_is_a_no_op() {
    let state = State::new(3);
    let mut sub = state.subscribe();
    assert_eq!(sub.drain(), vec![3]);

    assert!(!state.set(3));
    assert_eq!(state.version(), 0);
    assert!(sub.try_next().is_none());
}

/// N threads each incrementing M times never lose an update.
#[test]
fn test_concurrent_updates_are_atomic() {
    const THREADS: i64 = 8;
    const ROUNDS: i64 = 500;

    let state = State::new(0i64);
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let state = state.clone();
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    state.update(|n| n + 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread");
    }

    assert_eq!(state.value(), THREADS * ROUNDS);
    assert_eq!(state.version(), (THREADS * ROUNDS) as u64);
}

/// Two threads write 1 then 2 in sequence; every subscriber sees 1 before 2.
#[test]
fn test_notifications_follow_commit_order() {
    let state = State::new(0);
    let mut sub = state.subscribe();
    let (tx, rx) = std::sync::mpsc::channel();

    let first = {
        let state = state.clone();
        thread::spawn(move || {
            state.set(1);
            tx.send(()).expect("signal");
        })
    };
    let second = {
        let state = state.clone();
        thread::spawn(move || {
            rx.recv().expect("wait for first write");
            state.set(2);
        })
    };
    first.join().expect("first");
    second.join().expect("second");

    assert_eq!(sub.drain(), vec![0, 1, 2]);
}

/// A subscriber that joins late gets the current value first.
#[test]
fn test_late_subscriber_receives_current_value() {
    let state = State::new("a".to_string());
    state.set("b".to_string());
    state.set("c".to_string());

    let mut late = state.subscribe();
    assert_eq!(late.drain(), vec!["c".to_string()]);

    state.set("d".to_string());
    assert_eq!(late.try_next().as_deref(), Some("d"));
}

/// Every subscriber observes the same sequence of values.
#[test]
fn test_all_subscribers_see_same_sequence() {
    let state = State::new(0u32);
    let mut a = state.subscribe();
    let mut b = state.subscribe();

    let writers: Vec<_> = (1..=4u32)
        .map(|n| {
            let state = state.clone();
            thread::spawn(move || {
                state.update(|v| v + n);
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer");
    }

    let seen_a = a.drain();
    let seen_b = b.drain();
    assert_eq!(seen_a, seen_b);
    assert_eq!(seen_a.last(), Some(&10));
    assert!(seen_a.windows(2).all(|pair| pair[0] < pair[1]));
}

/// compare_and_set only commits when the expected value is current.
#[test]
fn test_compare_and_set() {
    let state = State::new(vec!["home".to_string()]);
    let stale = state.value();
    state.update(|stack| {
        let mut stack = stack.clone();
        stack.push("detail".to_string());
        stack
    });

    let rejected = state.compare_and_set(&stale, vec!["other".to_string()]);
    assert_eq!(rejected, Err(vec!["home".to_string(), "detail".to_string()]));

    let current = state.value();
    assert!(state.compare_and_set(&current, Vec::new()).is_ok());
    assert!(state.value().is_empty());
}

/// reset restores the construction-time value.
#[test]
fn test_reset_restores_initial_value() {
    let state = State::new(10);
    state.set(42);
    assert!(state.reset());
    assert_eq!(state.value(), 10);
    assert!(!state.reset());
}

/// A converted view reads and writes through the source cell.
#[test]
fn test_converted_state_maps_both_ways() {
    let celsius = State::new(100.0f64);
    let fahrenheit = celsius.convert(|c| c * 9.0 / 5.0 + 32.0, |f| (f - 32.0) * 5.0 / 9.0);
    assert_eq!(fahrenheit.value(), 212.0);

    let mut sub = fahrenheit.subscribe();
    assert_eq!(sub.drain(), vec![212.0]);

    assert!(fahrenheit.set(32.0));
    assert_eq!(celsius.value(), 0.0);
    assert_eq!(sub.try_next(), Some(32.0));
}

/// Subscriptions can be awaited from async code.
#[tokio::test]
async fn test_subscription_awaits_next_change() {
    let state = Arc::new(State::new(0));
    let mut sub = state.subscribe();
    assert_eq!(sub.next().await, Some(0));

    let writer = {
        let state = state.clone();
        tokio::spawn(async move {
            state.set(7);
        })
    };
    writer.await.expect("writer task");
    assert_eq!(sub.next().await, Some(7));
}
