//! Integration tests for capture sessions

use capq_core::{
    predicate_fn, CaptureSession, CapturedPacket, Config, DropPolicy, Error, FrameBuilder,
    InterfaceRequest, MemoryBackend, ProtocolTags, SessionState,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn config(capacity: usize, policy: DropPolicy) -> Config {
    let mut config = Config::default();
    config.queue.capacity = capacity;
    config.queue.drop_strategy = policy;
    config.capture.read_timeout_ms = 5;
    config
}

fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_overflow_drop_incoming_keeps_first_packet() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session =
        CaptureSession::new(&config(1, DropPolicy::DropIncoming), Arc::new(backend.clone()))
            .unwrap();
    session.start().unwrap();

    backend.push_frames([FrameBuilder::tcp_v4().build(), FrameBuilder::tcp_v4().build()]);
    wait_for(|| session.get_metrics().packets_captured == 2);
    session.stop().unwrap();

    let snap = session.get_metrics();
    assert_eq!(snap.packets_enqueued, 2);
    assert_eq!(snap.packets_dropped, 1);

    let first = session.dequeue(false, None).unwrap();
    assert_eq!(first.sequence(), 0);
    assert!(session.dequeue(false, None).is_none());
}

#[test]
fn test_unknown_interface_lists_available() {
    let backend = MemoryBackend::with_interfaces(["eth0", "lo"]);
    let mut config = config(8, DropPolicy::DropOldest);
    config.capture.interface = Some("eth9".into());

    match CaptureSession::new(&config, Arc::new(backend)).unwrap_err() {
        Error::InterfaceNotFound { requested, available } => {
            assert_eq!(requested, "eth9");
            assert_eq!(available, names(&["eth0", "lo"]));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_no_interfaces_regardless_of_request() {
    for requested in [
        None,
        Some(InterfaceRequest::name("eth0")),
        Some(InterfaceRequest::Invalid("integer")),
    ] {
        let mut config = config(8, DropPolicy::DropOldest);
        config.capture.interface = requested;
        let err = CaptureSession::new(&config, Arc::new(MemoryBackend::new())).unwrap_err();
        assert!(matches!(err, Error::NoInterfacesAvailable), "{err:?}");
    }
}

#[test]
fn test_udp_filter_counts() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session =
        CaptureSession::new(&config(16, DropPolicy::DropOldest), Arc::new(backend.clone()))
            .unwrap();
    session.add_filter(predicate_fn("reject-udp", |p: &CapturedPacket| {
        !p.protocols().contains(ProtocolTags::UDP)
    }));
    session.start().unwrap();

    backend.push_frames([FrameBuilder::tcp_v4().build(), FrameBuilder::udp_v4().build()]);
    wait_for(|| session.get_metrics().packets_captured == 2);
    session.stop().unwrap();

    let snap = session.get_metrics();
    assert_eq!(snap.packets_captured, 2);
    assert_eq!(snap.packets_filtered, 1);
    assert_eq!(snap.packets_enqueued, 1);

    let packet = session.dequeue(false, None).unwrap();
    assert!(packet.protocols().contains(ProtocolTags::TCP));
}

#[test]
fn test_reject_and_signal_does_not_count_drops() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session =
        CaptureSession::new(&config(2, DropPolicy::RejectAndSignal), Arc::new(backend.clone()))
            .unwrap();
    session.start().unwrap();

    backend.push_frames((0..5).map(|_| FrameBuilder::udp_v4().build()));
    wait_for(|| session.get_metrics().packets_captured == 5);
    session.stop().unwrap();

    let snap = session.get_metrics();
    assert_eq!(snap.packets_dropped, 0);
    assert_eq!(snap.packets_rejected, 3);

    let queue = session.queue();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.strategy_name(), "reject_and_signal");
    assert_eq!(queue.drain().len(), 2);

    let snap = session.get_metrics();
    assert_eq!(snap.packets_captured, snap.packets_filtered + snap.packets_enqueued);
    assert_eq!(snap.packets_enqueued, snap.packets_dequeued + snap.packets_rejected);
}

#[test]
fn test_filter_added_mid_capture_is_not_retroactive() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session =
        CaptureSession::new(&config(16, DropPolicy::DropOldest), Arc::new(backend.clone()))
            .unwrap();
    session.start().unwrap();

    backend.push_frames((0..3).map(|_| FrameBuilder::tcp_v4().build()));
    wait_for(|| session.get_metrics().packets_enqueued == 3);
    assert_eq!(session.state(), SessionState::Capturing);

    session.add_filter(predicate_fn("no-tcp", |p: &CapturedPacket| {
        !p.protocols().contains(ProtocolTags::TCP)
    }));
    backend.push_frames([
        FrameBuilder::tcp_v4().build(),
        FrameBuilder::tcp_v4().build(),
        FrameBuilder::udp_v4().build(),
    ]);
    wait_for(|| {
        let snap = session.get_metrics();
        snap.packets_filtered == 2 && snap.packets_enqueued == 4
    });
    session.stop().unwrap();

    // TCP packets queued before the filter existed are still delivered
    let delivered: Vec<(u64, bool)> = session
        .queue()
        .drain()
        .iter()
        .map(|p| (p.sequence(), p.protocols().contains(ProtocolTags::TCP)))
        .collect();
    assert_eq!(delivered, vec![(0, true), (1, true), (2, true), (5, false)]);
}

#[test]
fn test_strategy_swapped_mid_capture() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session =
        CaptureSession::new(&config(2, DropPolicy::DropOldest), Arc::new(backend.clone()))
            .unwrap();
    session.start().unwrap();

    backend.push_frames((0..3).map(|_| FrameBuilder::tcp_v4().build()));
    wait_for(|| session.get_metrics().packets_dropped == 1);

    session.set_drop_strategy(DropPolicy::RejectAndSignal);
    assert_eq!(session.queue().strategy_name(), "reject_and_signal");

    backend.push_frames((0..2).map(|_| FrameBuilder::tcp_v4().build()));
    wait_for(|| session.get_metrics().packets_rejected == 2);
    session.stop().unwrap();

    let snap = session.get_metrics();
    assert_eq!(snap.packets_captured, 5);
    assert_eq!(snap.packets_enqueued, 5);
    assert_eq!(snap.packets_dropped, 1);
    assert_eq!(snap.packets_rejected, 2);

    // Oldest was evicted before the swap; nothing was evicted after it
    let seqs: Vec<u64> = session.queue().drain().iter().map(|p| p.sequence()).collect();
    assert_eq!(seqs, vec![1, 2]);
}

#[test]
fn test_configured_rule_filters() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let mut config = Config::from_toml(
        r#"
        [queue]
        capacity = 32

        [[filters]]
        name = "dns-only"
        rule = { all = [{ protocol = "udp" }, { port = 53 }] }
        "#,
    )
    .unwrap();
    config.capture.read_timeout_ms = 5;

    let session = CaptureSession::new(&config, Arc::new(backend.clone())).unwrap();
    session.start().unwrap();
    backend.push_frames([
        FrameBuilder::udp_v4().dst_port(53).build(),
        FrameBuilder::udp_v4().dst_port(123).build(),
        FrameBuilder::tcp_v4().dst_port(53).build(),
        FrameBuilder::arp().build(),
    ]);
    wait_for(|| session.get_metrics().packets_captured == 4);
    session.stop().unwrap();

    let snap = session.get_metrics();
    assert_eq!(snap.packets_filtered, 3);
    assert_eq!(snap.packets_enqueued, 1);
    assert_eq!(session.queue().drain()[0].summary().dst_port, Some(53));
}

#[test]
fn test_sequences_are_monotonic() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session =
        CaptureSession::new(&config(64, DropPolicy::DropOldest), Arc::new(backend.clone()))
            .unwrap();
    session.start().unwrap();
    backend.push_frames((0..20).map(|_| FrameBuilder::tcp_v4().build()));
    wait_for(|| session.get_metrics().packets_captured == 20);
    session.stop().unwrap();

    let seqs: Vec<u64> = session.queue().drain().iter().map(|p| p.sequence()).collect();
    assert_eq!(seqs, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_queue_survives_stop() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session =
        CaptureSession::new(&config(8, DropPolicy::DropOldest), Arc::new(backend.clone()))
            .unwrap();
    let queue = session.queue();
    session.start().unwrap();
    backend.push_frames((0..3).map(|_| FrameBuilder::tcp_v4().build()));
    wait_for(|| session.get_metrics().packets_captured == 3);
    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);

    drop(session);
    assert_eq!(queue.drain().len(), 3);
}

#[test]
fn test_metric_invariants_under_load() {
    let backend = MemoryBackend::with_interfaces(["eth0"]);
    let session = Arc::new(
        CaptureSession::new(&config(8, DropPolicy::DropOldest), Arc::new(backend.clone()))
            .unwrap(),
    );
    session.add_filter(predicate_fn("no-arp", |p: &CapturedPacket| {
        !p.protocols().contains(ProtocolTags::ARP)
    }));
    session.start().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let queue = session.queue();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut got = 0u64;
                while !done.load(Ordering::SeqCst) {
                    if queue.dequeue_timeout(Duration::from_millis(5)).is_some() {
                        got += 1;
                        thread::sleep(Duration::from_micros(50));
                    }
                }
                got
            })
        })
        .collect();

    let total = 2_000u64;
    let feeder = {
        let backend = backend.clone();
        thread::spawn(move || {
            for i in 0..total {
                if i % 4 == 0 {
                    backend.push_frame(FrameBuilder::arp().build());
                } else {
                    backend.push_frame(FrameBuilder::tcp_v4().build());
                }
            }
        })
    };

    let check = |s: &capq_core::MetricsSnapshot| {
        assert!(s.packets_captured >= s.packets_filtered + s.packets_enqueued);
        assert!(s.packets_enqueued >= s.packets_dequeued + s.packets_dropped);
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while session.get_metrics().packets_captured < total {
        assert!(Instant::now() < deadline, "producer stalled");
        check(&session.get_metrics());
        thread::yield_now();
    }
    feeder.join().unwrap();
    session.stop().unwrap();
    done.store(true, Ordering::SeqCst);

    let consumed: u64 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    let leftover = session.queue().drain().len() as u64;

    let snap = session.get_metrics();
    check(&snap);
    assert_eq!(snap.packets_captured, total);
    assert_eq!(snap.packets_filtered, total / 4);
    assert_eq!(snap.packets_captured, snap.packets_filtered + snap.packets_enqueued);
    assert_eq!(
        snap.packets_enqueued,
        snap.packets_dequeued + snap.packets_dropped + snap.packets_rejected
    );
    assert_eq!(snap.packets_dequeued, consumed + leftover);
}
