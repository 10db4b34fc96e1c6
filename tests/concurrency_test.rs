//! Multi-threaded structural mutation.

use std::sync::{Arc, Barrier};
use std::thread;

use nodecomp::samples::{EventLog, Marker, Recorder, Value};
use nodecomp::util::testing::init_test_setup;
use nodecomp::{Compose, Owned};

const THREADS: usize = 8;
const ROUNDS: usize = 200;

#[test]
fn given_distinct_nodes_when_mutated_in_parallel_then_each_consistent() {
    init_test_setup();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let node = Owned::new(Marker::default());
                barrier.wait();
                for round in 0..ROUNDS {
                    node.add(Value::new((i * ROUNDS + round) as i64)).unwrap();
                    if round % 3 == 0 {
                        node.remove::<Value>();
                    }
                }
                node.require::<Value>().map(|value| value.value()).ok()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let last = handle.join().unwrap();
        assert_eq!(last, Some((i * ROUNDS + ROUNDS - 1) as i64));
    }
}

#[test]
fn given_shared_node_when_mutated_in_parallel_then_map_consistent() {
    init_test_setup();
    let log = EventLog::new();
    let root = Arc::new(Owned::new(Recorder::new("root", &log)));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let root = Arc::clone(&root);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    match (i + round) % 4 {
                        0 => {
                            root.add(Value::new(round as i64)).unwrap();
                        }
                        1 => {
                            root.remove::<Value>();
                        }
                        2 => {
                            if let Some(value) = root.separate::<Value>() {
                                root.adopt(value).unwrap();
                            }
                        }
                        _ => {
                            root.acquire::<Marker>().unwrap();
                            let _ = root.has::<Value>();
                            let _ = root.components().len();
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let components = root.components();
    assert!(components.len() <= 2);
    for (_, child) in &components {
        assert!(child.core().parent::<Recorder>().is_some());
    }
    drop(components);

    // Every attach is paired with exactly one detach once the tree is cleared.
    root.clear();
    let attached = log
        .events()
        .iter()
        .filter(|e| matches!(e, nodecomp::samples::HookEvent::ComponentAttached { .. }))
        .count();
    let detached = log
        .events()
        .iter()
        .filter(|e| matches!(e, nodecomp::samples::HookEvent::ComponentDetached { .. }))
        .count();
    assert_eq!(attached, detached);
}

#[test]
fn given_shared_node_when_readers_run_in_parallel_then_all_see_child() {
    init_test_setup();
    let root = Arc::new(Owned::new(Marker::default()));
    root.add(Value::new(11)).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let root = Arc::clone(&root);
            thread::spawn(move || {
                (0..ROUNDS)
                    .map(|_| root.require::<Value>().map(|v| v.value()).unwrap_or(-1))
                    .all(|v| v == 11)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
