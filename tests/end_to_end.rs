//! Two channels of four frames from the plugin to the consumer's bytes.

mod helpers;

use helpers::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use synthcast::core::{convert::deinterleave, ControlEvent, RenderClock, SampleLayout};
use synthcast::sink::MemorySink;
use synthcast::Engine;

const CHANNEL_0: [f32; 4] = [0.1, 0.2, 0.3, 0.4];
const CHANNEL_1: [f32; 4] = [1.1, 1.2, 1.3, 1.4];

fn two_channels() -> Script {
    Script::new(vec![CHANNEL_0.to_vec(), CHANNEL_1.to_vec()])
}

#[test]
fn interleaved_block_bytes() {
    let (host, _) = scripted_host(two_channels(), 4, SampleLayout::Interleaved);
    let mut clock = RenderClock::new();

    let payload = host.render_block(&mut clock, 4).expect("block rendered");
    assert_eq!(
        payload.as_bytes(),
        f32_bytes(&[0.1, 1.1, 0.2, 1.2, 0.3, 1.3, 0.4, 1.4]).as_slice()
    );
    assert_eq!(payload.len(), host.format().payload_len(4));
    assert_eq!(clock.position(), 4);

    let channels = deinterleave(&payload.samples(), 2);
    assert_eq!(channels, vec![CHANNEL_0.to_vec(), CHANNEL_1.to_vec()]);
}

#[test]
fn planar_block_bytes() {
    let (host, _) = scripted_host(two_channels(), 4, SampleLayout::Planar);
    let mut clock = RenderClock::new();

    let payload = host.render_block(&mut clock, 4).expect("block rendered");
    assert_eq!(
        payload.as_bytes(),
        f32_bytes(&[0.1, 0.2, 0.3, 0.4, 1.1, 1.2, 1.3, 1.4]).as_slice()
    );
    assert_eq!(&payload.as_bytes()[..16], f32_bytes(&CHANNEL_0).as_slice());
    assert_eq!(&payload.as_bytes()[16..], f32_bytes(&CHANNEL_1).as_slice());
}

#[test]
fn engine_streams_blocks_and_forwards_events() {
    let (registry, trace) = scripted_registry(two_channels());
    let sink = Arc::new(MemorySink::new());

    let mut engine = Engine::builder()
        .instrument(scripted_criteria())
        .host_options(quick_options(4, SampleLayout::Interleaved))
        .registry(Box::new(registry))
        .sink(sink.clone())
        .midi(false)
        .render_period(Duration::from_millis(1))
        .build()
        .unwrap();
    assert!(trace.initialized.load(Ordering::SeqCst));

    engine.host().deliver_control_event(ControlEvent::new(0x90, 60, 100));
    engine.start().unwrap();
    assert!(engine.is_running());

    let deadline = Instant::now() + Duration::from_secs(5);
    while sink.len() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    let stats = engine.shutdown();

    assert!(stats.sent >= 3);
    let expected = f32_bytes(&[0.1, 1.1, 0.2, 1.2, 0.3, 1.3, 0.4, 1.4]);
    let payloads = sink.take();
    assert!(payloads.len() as u64 >= 3);
    for payload in &payloads {
        assert_eq!(payload.as_bytes(), expected.as_slice());
    }

    assert_eq!(*trace.events.lock(), vec![[0x90, 60, 100]]);
    assert!(!trace.initialized.load(Ordering::SeqCst));
    assert!(trace.disposed.load(Ordering::SeqCst));

    // Second shutdown is a no-op with the same answer.
    assert_eq!(engine.shutdown(), stats);
}
