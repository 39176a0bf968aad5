use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use synthcast_core::{unpack_packet, ControlEvent};

type Deliver = dyn Fn(ControlEvent) + Send + Sync;

#[derive(Debug, Default)]
struct Counters {
    packets: AtomicU64,
    forwarded: AtomicU64,
}

/// Packet counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub packets: u64,
    pub forwarded: u64,
}

/// Carries the delivery capability into each input connection's callback.
///
/// Clones share the capability and the counters. Dispatching never allocates.
#[derive(Clone)]
pub struct ControlEventDispatcher {
    deliver: Arc<Deliver>,
    counters: Arc<Counters>,
}

impl ControlEventDispatcher {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(ControlEvent) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Forward every 3-byte message in `bytes`; returns how many were forwarded.
    pub fn dispatch_packet(&self, bytes: &[u8]) -> usize {
        self.counters.packets.fetch_add(1, Ordering::Relaxed);
        let mut forwarded = 0;
        for event in unpack_packet(bytes) {
            (self.deliver)(event);
            forwarded += 1;
        }
        self.counters
            .forwarded
            .fetch_add(forwarded as u64, Ordering::Relaxed);
        forwarded
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            packets: self.counters.packets.load(Ordering::Relaxed),
            forwarded: self.counters.forwarded.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ControlEventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEventDispatcher")
            .field("stats", &self.stats())
            .finish()
    }
}
