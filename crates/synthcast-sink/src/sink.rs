use crate::error::{Result, SinkError};
use crate::target::SinkTarget;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use synthcast_core::OutputPayload;

/// Blocks buffered between the render tick and the writer thread.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Pause before reopening a target that could not be opened.
const REOPEN_DELAY: Duration = Duration::from_secs(1);

/// Destination for rendered payloads.
///
/// `send` never blocks: a sink that cannot take the payload right now drops
/// it and says why.
pub trait PayloadSink: Send + Sync {
    fn send(&self, payload: OutputPayload) -> Result<()>;

    fn is_connected(&self) -> bool {
        true
    }

    /// Stop accepting payloads. Idempotent.
    fn close(&self) {}
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    written: AtomicU64,
    bytes: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub queued: u64,
    pub written: u64,
    pub bytes: u64,
    pub dropped: u64,
}

struct Shared {
    target: SinkTarget,
    connected: AtomicBool,
    counters: Counters,
}

/// Byte-stream sink backed by a writer thread.
///
/// The render tick hands payloads over a bounded channel; the writer thread
/// opens the target (blocking until a consumer attaches), writes each payload
/// whole, and reopens the target after a write failure.
pub struct TransportSink {
    tx: Mutex<Option<Sender<OutputPayload>>>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TransportSink {
    pub fn open(target: SinkTarget) -> Result<Self> {
        Self::with_capacity(target, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(target: SinkTarget, capacity: usize) -> Result<Self> {
        target.prepare()?;

        let (tx, rx) = bounded(capacity.max(1));
        let shared = Arc::new(Shared {
            target,
            connected: AtomicBool::new(false),
            counters: Counters::default(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("synthcast-sink".to_string())
                .spawn(move || writer_loop(&shared, &rx))?
        };

        tracing::info!("Waiting for consumer on {}", shared.target);
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn target(&self) -> &SinkTarget {
        &self.shared.target
    }

    pub fn stats(&self) -> SinkStats {
        let c = &self.shared.counters;
        SinkStats {
            queued: c.queued.load(Ordering::Relaxed),
            written: c.written.load(Ordering::Relaxed),
            bytes: c.bytes.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting payloads and let the writer thread wind down. Idempotent.
    ///
    /// The writer is joined only if it has already finished; a writer still
    /// blocked waiting for a pipe reader is left to exit with the process.
    pub fn close(&self) {
        if self.tx.lock().take().is_none() {
            return;
        }
        self.shared.connected.store(false, Ordering::Release);

        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| w.is_finished()) {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
        tracing::debug!("Transport sink closed");
    }
}

impl PayloadSink for TransportSink {
    fn send(&self, payload: OutputPayload) -> Result<()> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(SinkError::TransportUnavailable);
        };
        if !self.shared.connected.load(Ordering::Acquire) {
            self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(SinkError::TransportUnavailable);
        }

        match tx.try_send(payload) {
            Ok(()) => {
                self.shared.counters.queued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SinkError::Backpressure)
            }
            Err(TrySendError::Disconnected(_)) => Err(SinkError::TransportUnavailable),
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    fn close(&self) {
        TransportSink::close(self);
    }
}

impl Drop for TransportSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn writer_loop(shared: &Shared, rx: &Receiver<OutputPayload>) {
    loop {
        match shared.target.open() {
            Ok(writer) => {
                // Whatever was queued for a previous consumer is stale now.
                let stale = rx.try_iter().count() as u64;
                shared.counters.dropped.fetch_add(stale, Ordering::Relaxed);

                shared.connected.store(true, Ordering::Release);
                tracing::info!("Consumer connected on {}", shared.target);

                let finished = pump(shared, writer, rx);
                shared.connected.store(false, Ordering::Release);
                if finished {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", shared.target, e);
                match rx.recv_timeout(REOPEN_DELAY) {
                    Err(RecvTimeoutError::Disconnected) => return,
                    Ok(_) | Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }
    }
}

/// Write payloads until the channel closes (`true`) or a write fails (`false`).
fn pump(shared: &Shared, mut writer: Box<dyn Write + Send>, rx: &Receiver<OutputPayload>) -> bool {
    for payload in rx.iter() {
        if let Err(e) = writer.write_all(payload.as_bytes()).and_then(|()| writer.flush()) {
            tracing::warn!("Consumer on {} disconnected: {}", shared.target, e);
            shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        shared.counters.written.fetch_add(1, Ordering::Relaxed);
        shared
            .counters
            .bytes
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
    }
    true
}

/// In-process sink that keeps every payload, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    payloads: Mutex<Vec<OutputPayload>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.payloads.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.lock().is_empty()
    }

    pub fn take(&self) -> Vec<OutputPayload> {
        std::mem::take(&mut *self.payloads.lock())
    }
}

impl PayloadSink for MemorySink {
    fn send(&self, payload: OutputPayload) -> Result<()> {
        self.payloads.lock().push(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Instant;
    use synthcast_core::{convert, AudioBlock, SampleLayout};

    fn payload(value: f32, frames: usize) -> OutputPayload {
        let block = AudioBlock::from_channels(vec![vec![value; frames]; 2]).unwrap();
        convert(&block, SampleLayout::Interleaved)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_tcp_delivers_payload_bytes_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sink = TransportSink::open(SinkTarget::Tcp(addr)).unwrap();

        let (mut consumer, _) = listener.accept().unwrap();
        assert!(wait_until(|| sink.is_connected()));

        let first = payload(0.25, 4);
        let second = payload(-1.0, 4);
        let mut expected = first.as_bytes().to_vec();
        expected.extend_from_slice(second.as_bytes());

        sink.send(first).unwrap();
        sink.send(second).unwrap();

        let mut received = vec![0u8; expected.len()];
        consumer.read_exact(&mut received).unwrap();
        assert_eq!(received, expected);
        assert!(wait_until(|| sink.stats().written == 2));
        assert_eq!(sink.stats().bytes, expected.len() as u64);
    }

    #[test]
    fn test_send_without_consumer_is_unavailable() {
        // Nothing listens on a port we just released.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let sink = TransportSink::open(SinkTarget::Tcp(addr)).unwrap();

        let err = sink.send(payload(0.5, 4)).unwrap_err();
        assert!(matches!(err, SinkError::TransportUnavailable));
        assert!(err.is_transient());
        assert_eq!(sink.stats().dropped, 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sink = TransportSink::open(SinkTarget::Tcp(addr)).unwrap();
        let _consumer = listener.accept().unwrap();
        assert!(wait_until(|| sink.is_connected()));

        sink.close();
        sink.close();
        assert!(!sink.is_connected());
        assert!(matches!(
            sink.send(payload(0.0, 4)),
            Err(SinkError::TransportUnavailable)
        ));
    }

    #[test]
    fn test_memory_sink_keeps_payloads() {
        let sink = MemorySink::new();
        sink.send(payload(1.0, 2)).unwrap();
        sink.send(payload(2.0, 2)).unwrap();
        assert_eq!(sink.len(), 2);
        let taken = sink.take();
        assert_eq!(taken[1].samples(), vec![2.0; 4]);
        assert!(sink.is_empty());
    }
}
