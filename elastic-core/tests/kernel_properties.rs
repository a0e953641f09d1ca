use std::collections::VecDeque;

use elastic_core::{ElasticKernel, KernelConfig, KernelError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push(usize),
    Render(usize),
    SetRate(f64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..2_500).prop_map(Op::Push),
        (1usize..300).prop_map(Op::Render),
        (0.25f64..=4.0).prop_map(Op::SetRate),
    ]
}

fn unity_op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..600).prop_map(Op::Push),
        (1usize..300).prop_map(Op::Render),
    ]
}

proptest! {
    #[test]
    fn occupancy_never_leaves_capacity_bounds(
        capacity in 1usize..2_000,
        ops in prop::collection::vec(op_strategy(), 1..64),
    ) {
        let mut kernel = ElasticKernel::new(capacity).unwrap();
        let monitor = kernel.monitor();
        let mut next = 0u32;

        for op in ops {
            match op {
                Op::Push(len) => {
                    let chunk: Vec<f32> = (0..len).map(|i| (next + i as u32) as f32).collect();
                    next += len as u32;
                    kernel.push(&chunk);
                }
                Op::Render(len) => {
                    let mut out = vec![f32::NAN; len];
                    kernel.render(&mut out);
                    prop_assert!(out.iter().all(|s| s.is_finite()));
                }
                Op::SetRate(rate) => {
                    prop_assert!(kernel.set_playback_rate(rate).is_ok());
                }
            }

            let (read, write) = monitor.cursor_positions();
            prop_assert!(read <= write, "read {} passed write {}", read, write);
            prop_assert!(write - read <= capacity as u64, "{} unread in {}", write - read, capacity);
            prop_assert_eq!(monitor.occupancy() as u64, write - read);
            let health = kernel.health();
            prop_assert!((0.0..=1.0).contains(&health), "health {}", health);
        }
    }

    #[test]
    fn unity_rate_matches_drop_oldest_queue_model(
        capacity in 1usize..500,
        ops in prop::collection::vec(unity_op_strategy(), 1..64),
    ) {
        let mut kernel = ElasticKernel::new(capacity).unwrap();
        let mut model: VecDeque<f32> = VecDeque::new();
        let mut next = 1u32;

        for op in ops {
            match op {
                Op::Push(len) => {
                    let chunk: Vec<f32> = (0..len).map(|i| (next + i as u32) as f32).collect();
                    next += len as u32;
                    kernel.push(&chunk);
                    model.extend(chunk);
                    while model.len() > capacity {
                        model.pop_front();
                    }
                }
                Op::Render(len) => {
                    let mut out = vec![0.0f32; len];
                    kernel.render(&mut out);
                    let take = len.min(model.len());
                    let mut expected: Vec<f32> = model.drain(..take).collect();
                    expected.resize(len, 0.0);
                    prop_assert_eq!(out, expected);
                }
                Op::SetRate(_) => unreachable!(),
            }
            let (read, write) = kernel.monitor().cursor_positions();
            prop_assert_eq!(write - read, model.len() as u64);
        }
    }

    #[test]
    fn out_of_bounds_rates_always_fail(rate in prop_oneof![-100.0f64..=0.0, 4.0001f64..100.0]) {
        let kernel = ElasticKernel::new(64).unwrap();
        let rejected = matches!(
            kernel.set_playback_rate(rate),
            Err(KernelError::InvalidRate { .. })
        );
        prop_assert!(rejected);
        prop_assert_eq!(kernel.playback_rate(), 1.0);
    }
}

#[test]
fn documented_overflow_scenario() {
    let mut kernel = ElasticKernel::new(1000).unwrap();
    let ramp: Vec<f32> = (0..1200).map(|v| v as f32).collect();
    kernel.push(&ramp);
    assert_eq!(kernel.health(), 1.0);

    let mut out = [0.0f32; 128];
    kernel.render(&mut out);
    let expected: Vec<f32> = (200..328).map(|v| v as f32).collect();
    assert_eq!(out.to_vec(), expected);

    let stats = kernel.stats();
    assert_eq!(stats.dropped_samples, 200);
    assert_eq!(stats.rendered_quanta, 1);
    assert_eq!(stats.underrun_quanta, 0);
}

#[test]
fn narrow_rate_bounds_are_enforced() {
    let kernel = ElasticKernel::with_config(KernelConfig {
        capacity: 128,
        min_rate: 0.5,
        max_rate: 2.0,
        ..Default::default()
    })
    .unwrap();

    assert!(kernel.set_playback_rate(0.4).is_err());
    assert!(kernel.set_playback_rate(2.5).is_err());
    assert!(kernel.set_playback_rate(1.0).is_ok());
    assert!(kernel.set_playback_rate(2.0).is_ok());
}
