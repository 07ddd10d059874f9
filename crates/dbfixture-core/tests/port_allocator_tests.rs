// Ephemeral port allocation

use dbfixture_core::port::{PortAllocator, EPHEMERAL_PORTS};
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn test_repeated_allocation_returns_same_port() {
    let ports = PortAllocator::new();
    let first = ports.allocate();
    for _ in 0..100 {
        assert_eq!(ports.allocate(), first);
    }
}

#[test]
fn test_allocation_is_stable_across_threads() {
    let ports = Arc::new(PortAllocator::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ports = Arc::clone(&ports);
            std::thread::spawn(move || ports.allocate())
        })
        .collect();

    let drawn: Vec<u16> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(drawn.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_unseeded_port_in_dynamic_range() {
    for _ in 0..200 {
        let port = PortAllocator::new().allocate();
        assert!(EPHEMERAL_PORTS.contains(&port), "port {} out of range", port);
    }
}

proptest! {
    #[test]
    fn prop_seeded_port_in_range_and_stable(seed in any::<u64>()) {
        let ports = PortAllocator::seeded(seed);
        let port = ports.allocate();
        prop_assert!(port >= 49152);
        prop_assert!(port < 65535);
        prop_assert_eq!(ports.allocate(), port);
    }
}
