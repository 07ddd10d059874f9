//! Ephemeral host port selection
//!
//! One port is drawn from the dynamic/private range the first time it is
//! needed and reused for the allocator's lifetime. The port is not probed
//! for availability: another listener on the host, or another test process
//! drawing the same number, produces a collision that surfaces only when the
//! container engine fails to bind it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::{Mutex, OnceLock};

/// Dynamic/private port range, upper bound exclusive
pub const EPHEMERAL_PORTS: Range<u16> = 49152..65535;

enum PortSource {
    Thread,
    Seeded(Mutex<StdRng>),
}

/// Memoizing ephemeral port allocator
pub struct PortAllocator {
    source: PortSource,
    port: OnceLock<u16>,
}

impl PortAllocator {
    /// Allocator drawing from the thread-local RNG
    pub fn new() -> Self {
        Self {
            source: PortSource::Thread,
            port: OnceLock::new(),
        }
    }

    /// Allocator with a reproducible draw
    pub fn seeded(seed: u64) -> Self {
        Self {
            source: PortSource::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
            port: OnceLock::new(),
        }
    }

    /// Allocator that always hands out `port`
    pub fn fixed(port: u16) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(port);
        Self {
            source: PortSource::Thread,
            port: cell,
        }
    }

    /// Return the allocated port, drawing it on first use
    pub fn allocate(&self) -> u16 {
        *self.port.get_or_init(|| {
            let port = match &self.source {
                PortSource::Thread => rand::thread_rng().gen_range(EPHEMERAL_PORTS),
                PortSource::Seeded(rng) => match rng.lock() {
                    Ok(mut rng) => rng.gen_range(EPHEMERAL_PORTS),
                    Err(poisoned) => poisoned.into_inner().gen_range(EPHEMERAL_PORTS),
                },
            };
            tracing::debug!(host_port = port, "Allocated ephemeral host port");
            port
        })
    }

    /// The port if one has been drawn already
    pub fn peek(&self) -> Option<u16> {
        self.port.get().copied()
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PortAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortAllocator")
            .field("port", &self.peek())
            .finish()
    }
}
