use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use elastic_core::{ElasticKernel, KernelConfig};

const QUANTUM: usize = 128;

fn ramp_chunk(start: u32, len: usize) -> Vec<f32> {
    (0..len as u32).map(|i| (start + i) as f32).collect()
}

/// Producer never overflows (it waits for free space), so every sample must
/// come out exactly once and in order despite underruns along the way.
#[test]
fn throttled_producer_preserves_every_sample_in_order() {
    const TOTAL: u32 = 200_000;

    let kernel = ElasticKernel::with_config(KernelConfig {
        capacity: 4_096,
        quantum_size: QUANTUM,
        ..Default::default()
    })
    .unwrap();
    let (mut ingest, mut render, monitor) = kernel.split();
    let done = Arc::new(AtomicBool::new(false));

    let producer_done = Arc::clone(&done);
    let producer = thread::spawn(move || {
        // Values start at 1 so silence (0.0) is distinguishable.
        let mut next = 1u32;
        let mut chunk_len = 37usize;
        while next <= TOTAL {
            let len = chunk_len.min((TOTAL - next + 1) as usize);
            if ingest.free_space() < len {
                thread::yield_now();
                continue;
            }
            ingest.push(&ramp_chunk(next, len));
            next += len as u32;
            chunk_len = (chunk_len * 7 + 13) % 900 + 1;
        }
        producer_done.store(true, Ordering::Release);
    });

    let mut out = [0.0f32; QUANTUM];
    let mut expected = 1u32;
    let deadline = Instant::now() + Duration::from_secs(30);

    while expected <= TOTAL {
        assert!(Instant::now() < deadline, "stress test timed out at {expected}");
        render.render(&mut out);
        for &sample in out.iter().filter(|&&s| s != 0.0) {
            assert_eq!(sample, expected as f32);
            expected += 1;
        }
        let (read, write) = monitor.cursor_positions();
        assert!(read <= write);
        assert!(write - read <= monitor.capacity() as u64);
        if done.load(Ordering::Acquire) && monitor.occupancy() == 0 {
            break;
        }
    }

    producer.join().unwrap();
    assert_eq!(expected, TOTAL + 1);

    let stats = monitor.stats();
    assert_eq!(stats.pushed_samples, TOTAL as u64);
    assert_eq!(stats.dropped_samples, 0);
    assert_eq!(stats.render_collisions, 0);
}

/// Unthrottled producer overruns a small ring; the capacity invariant must
/// hold from both sides throughout.
#[test]
fn overflowing_producer_keeps_capacity_invariant() {
    const CAPACITY: usize = 512;

    let kernel = ElasticKernel::with_config(KernelConfig {
        capacity: CAPACITY,
        quantum_size: QUANTUM,
        ..Default::default()
    })
    .unwrap();
    let rate = kernel.rate_control();
    let (mut ingest, mut render, monitor) = kernel.split();
    let stop = Arc::new(AtomicBool::new(false));

    let producer_stop = Arc::clone(&stop);
    let producer_monitor = monitor.clone();
    let producer = thread::spawn(move || {
        let mut next = 1u32;
        while !producer_stop.load(Ordering::Acquire) {
            ingest.push(&ramp_chunk(next, 300));
            next = next.wrapping_add(300) % 1_000_000 + 1;
            let health = producer_monitor.health();
            assert!((0.0..=1.0).contains(&health), "health {health}");
        }
        // One oversized chunk guarantees at least one counted drop.
        ingest.push(&ramp_chunk(1, CAPACITY * 2));
    });

    let control = thread::spawn(move || {
        for step in 0..200 {
            let value = [0.5, 1.0, 1.75, 3.0][step % 4];
            rate.set_playback_rate(value).unwrap();
            thread::sleep(Duration::from_micros(200));
        }
    });

    let mut out = [0.0f32; QUANTUM];
    for _ in 0..20_000 {
        render.render(&mut out);
        assert!(out.iter().all(|s| s.is_finite()));
        let (read, write) = monitor.cursor_positions();
        assert!(write <= read + CAPACITY as u64, "{} unread", write - read);
    }

    stop.store(true, Ordering::Release);
    producer.join().unwrap();
    control.join().unwrap();

    let stats = monitor.stats();
    assert_eq!(stats.rendered_quanta, 20_000);
    assert!(stats.dropped_samples >= CAPACITY as u64);
    assert!(stats.truncated_chunks >= 1);
    let (read, write) = monitor.cursor_positions();
    assert!(read <= write && write - read <= CAPACITY as u64);
}

/// Under sustained overflow at unity rate the output may have gaps (dropped
/// or zeroed samples) but a sample is never emitted after a newer one.
#[test]
fn overflow_never_reorders_output() {
    const CAPACITY: usize = 130;
    // Keep the ramp exactly representable as f32.
    const LIMIT: u32 = 1 << 23;

    let kernel = ElasticKernel::with_config(KernelConfig {
        capacity: CAPACITY,
        quantum_size: QUANTUM,
        ..Default::default()
    })
    .unwrap();
    let (mut ingest, mut render, monitor) = kernel.split();
    let stop = Arc::new(AtomicBool::new(false));

    let producer_stop = Arc::clone(&stop);
    let producer = thread::spawn(move || {
        let mut next = 1u32;
        while !producer_stop.load(Ordering::Acquire) && next < LIMIT - 120 {
            ingest.push(&ramp_chunk(next, 120));
            next += 120;
        }
    });

    let mut out = [0.0f32; QUANTUM];
    let mut last = 0.0f32;
    for _ in 0..50_000 {
        render.render(&mut out);
        for &sample in out.iter().filter(|&&s| s != 0.0) {
            assert!(sample > last, "{sample} emitted after {last}");
            last = sample;
        }
    }

    stop.store(true, Ordering::Release);
    producer.join().unwrap();

    assert!(last > 0.0, "nothing was rendered");
    assert_eq!(monitor.stats().rendered_quanta, 50_000);
}
