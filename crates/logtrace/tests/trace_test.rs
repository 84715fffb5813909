use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use logtrace::{
    trace, Arg, DirectorySink, FlushMode, MemorySink, RingBuffer, ShardId, ShardRegistry,
    TextRenderer, TraceConfig, WriteOutcome, DEFAULT_ARENA_CAPACITY, DEFAULT_RING_SIZE,
};
use proptest::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Flushes `ring` as text and returns the message part of every line.
fn flush_messages(ring: &mut RingBuffer) -> Vec<String> {
    let mut out = Vec::new();
    ring.flush(TextRenderer::new(&mut out)).unwrap();
    messages(&String::from_utf8(out).unwrap())
}

fn messages(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| {
            let (ts, msg) = l.split_once(' ').expect("timestamp separator");
            assert!(ts.ends_with('Z') && ts.contains('.'), "bad timestamp {ts:?}");
            msg.to_string()
        })
        .collect()
}

#[test]
fn renders_single_value() {
    let mut ring = RingBuffer::new(DEFAULT_RING_SIZE, DEFAULT_ARENA_CAPACITY);
    trace!(ring, "value={}", 42);
    assert_eq!(flush_messages(&mut ring), vec!["value=42"]);
}

#[test]
fn renders_placeholder_for_unsupported_argument() {
    let mut ring = RingBuffer::new(DEFAULT_RING_SIZE, DEFAULT_ARENA_CAPACITY);
    let unsupported = vec![1.0f32, 2.0];
    trace!(ring, "a={}, b={}, c={}", 1, Arg::opaque(&unsupported), "three");
    trace!(ring, "f={} s={}", 0.5, String::from("x").as_str());
    assert_eq!(flush_messages(&mut ring), vec!["a=1, b=?, c=three", "f=? s=x"]);
}

#[test]
fn flushing_empty_ring_emits_nothing() {
    let mut ring = RingBuffer::new(4, 1024);
    assert!(flush_messages(&mut ring).is_empty());
    assert!(ring.arenas().iter().all(|a| a.is_empty()));
}

#[test]
fn eight_thousand_entries_rotate_once() {
    init_logger();
    let mut ring = RingBuffer::new(DEFAULT_RING_SIZE, DEFAULT_ARENA_CAPACITY);
    for i in 0..8000i64 {
        assert_ne!(trace!(ring, "n={}", i), WriteOutcome::Dropped);
    }
    assert_eq!(ring.rotations(), 1);
    assert_eq!(ring.entry_count(), 8000);

    let msgs = flush_messages(&mut ring);
    let expected: Vec<String> = (0..8000).map(|i| format!("n={i}")).collect();
    assert_eq!(msgs, expected);
}

#[test]
fn wrapping_the_ring_loses_only_the_oldest_arenas() {
    // 30-byte entries, 10 per arena.
    let mut ring = RingBuffer::new(3, 300);
    for i in 0..50i64 {
        trace!(ring, "n={}", i);
    }
    assert_eq!(ring.rotations(), 4);

    let msgs = flush_messages(&mut ring);
    let expected: Vec<String> = (20..50).map(|i| format!("n={i}")).collect();
    assert_eq!(msgs, expected);
}

#[test]
fn writes_within_capacity_are_not_lost() {
    let mut ring = RingBuffer::new(8, 300);
    for i in 0..65i64 {
        trace!(ring, "n={}", i);
    }
    assert_eq!(ring.rotations(), 6);
    assert_eq!(flush_messages(&mut ring).len(), 65);
}

#[test]
fn oversized_entry_does_not_break_the_ring() {
    let mut ring = RingBuffer::new(2, 256);
    trace!(ring, "before");
    let huge = "z".repeat(1000);
    assert_eq!(trace!(ring, "huge {}", &huge), WriteOutcome::Dropped);
    trace!(ring, "after");
    assert_eq!(ring.dropped_entries(), 1);
    assert_eq!(flush_messages(&mut ring), vec!["before", "after"]);
}

#[test]
fn shards_flush_independently() {
    init_logger();
    let sink = MemorySink::new();
    let config = TraceConfig {
        arena_capacity: 4096,
        ring_size: 8,
        ..TraceConfig::default()
    };
    let registry = Arc::new(ShardRegistry::new(config, Arc::new(sink.clone())));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [("left", 300u32), ("right", 500u32)]
        .into_iter()
        .map(|(name, count)| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..count {
                    trace!(registry, "{} {}", name, i);
                }
                registry.flush_current().unwrap();
                (ShardId::current(), name, count)
            })
        })
        .collect();

    for handle in handles {
        let (shard, name, count) = handle.join().unwrap();
        let msgs = messages(&sink.text(shard));
        assert_eq!(msgs.len(), count as usize);
        for (i, msg) in msgs.iter().enumerate() {
            assert_eq!(msg, &format!("{name} {i}"));
        }
    }
    assert_eq!(registry.shard_ids().len(), 2);
}

#[test]
fn flush_from_another_thread_never_sees_partial_entries() {
    init_logger();
    let sink = MemorySink::new();
    let config = TraceConfig {
        arena_capacity: 16 * 1024,
        ring_size: 64,
        ..TraceConfig::default()
    };
    let registry = Arc::new(ShardRegistry::new(config, Arc::new(sink.clone())));
    let done = Arc::new(AtomicBool::new(false));
    const WRITES: u64 = 20_000;

    let writer = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let shard = ShardId::current();
            for i in 0..WRITES {
                trace!(registry, "seq={} tag={}", i, "payload");
            }
            done.store(true, Ordering::Release);
            shard
        })
    };

    while !done.load(Ordering::Acquire) {
        let summary = registry.flush_all();
        assert!(summary.is_ok());
        thread::yield_now();
    }
    let shard = writer.join().unwrap();
    assert!(registry.flush_all().is_ok());

    let msgs = messages(&sink.text(shard));
    let seqs: Vec<u64> = msgs
        .iter()
        .map(|m| {
            let rest = m.strip_prefix("seq=").expect("well-formed message");
            let (n, tag) = rest.split_once(' ').unwrap();
            assert_eq!(tag, "tag=payload");
            n.parse().unwrap()
        })
        .collect();

    // 41-byte entries never wrap a 1 MiB ring, so nothing is lost.
    assert_eq!(seqs, (0..WRITES).collect::<Vec<_>>());
}

#[test]
fn directory_sink_gets_text_and_raw_per_shard() {
    let dir = tempfile::tempdir().unwrap();
    let config = TraceConfig {
        arena_capacity: 1024,
        ring_size: 2,
        flush_mode: FlushMode::Both,
        output_dir: Some(dir.path().to_path_buf()),
    };
    config.validate().unwrap();
    let registry = ShardRegistry::with_config(config);

    let shard = registry.shard(ShardId(9000));
    trace!(shard, "flag={} count={}", true, 3u16);
    assert!(registry.flush_all().is_ok());

    let sink = DirectorySink::new(dir.path());
    let text = std::fs::read_to_string(sink.text_path(ShardId(9000))).unwrap();
    assert_eq!(messages(&text), vec!["flag=true count=3"]);
    let raw = std::fs::read(sink.raw_path(ShardId(9000))).unwrap();
    assert_eq!(raw.len(), logtrace::encoded_len(&[Arg::Bool(true), Arg::U16(3)]));
    assert_eq!(raw.last(), Some(&logtrace::SENTINEL));
}

fn arb_slot() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![any::<i64>().prop_map(Some), Just(None)]
}

proptest! {
    #[test]
    fn placeholders_fill_exactly_the_unsupported_positions(
        slots in prop::collection::vec(arb_slot(), 0..20)
    ) {
        let mut ring = RingBuffer::new(2, 4096);
        let template: &'static str =
            Box::leak(vec!["{}"; slots.len()].join(",").into_boxed_str());
        let args: Vec<Arg<'_>> = slots
            .iter()
            .map(|s| s.map_or(Arg::Opaque, Arg::I64))
            .collect();
        ring.write(template, &args);

        let expected: Vec<String> = slots
            .iter()
            .map(|s| s.map_or("?".to_string(), |v| v.to_string()))
            .collect();
        prop_assert_eq!(flush_messages(&mut ring), vec![expected.join(",")]);
    }
}
