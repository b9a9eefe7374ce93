/*!
 * Synthetic Workloads
 * Seeded generators; the engine itself never draws randomness
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::types::Tick;
use crate::task::TaskSpec;

/// The fixed five-task demonstration set: arrivals 0..4, bursts
/// 10/5/8/3/6, priorities 3/1/4/2/5. Every policy sees the same work, which
/// makes comparison tables meaningful.
#[must_use]
pub fn demo_set() -> Vec<TaskSpec> {
    let arrivals = [0, 1, 2, 3, 4];
    let bursts = [10, 5, 8, 3, 6];
    let priorities = [3, 1, 4, 2, 5];
    (0..5)
        .map(|i| {
            TaskSpec::new(i as u32 + 1, arrivals[i], bursts[i]).with_priority(priorities[i])
        })
        .collect()
}

/// Uniformly random arrivals and bursts over the given spans
#[must_use]
pub fn uniform(seed: u64, count: usize, arrival_span: Tick, max_burst: Tick) -> Vec<TaskSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let arrival = rng.gen_range(0..=arrival_span);
            let burst = rng.gen_range(1..=max_burst.max(1));
            let priority = rng.gen_range(0..8);
            TaskSpec::new(i as u32 + 1, arrival, burst).with_priority(priority)
        })
        .collect()
}

/// Arrivals clustered into bursts separated by quiet gaps; stresses the
/// idle-jump path and queue buildup
#[must_use]
pub fn bursty(seed: u64, clusters: usize, cluster_size: usize, gap: Tick) -> Vec<TaskSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut specs = Vec::with_capacity(clusters * cluster_size);
    let mut id = 1u32;
    for cluster in 0..clusters {
        let base = cluster as Tick * gap;
        for _ in 0..cluster_size {
            let arrival = base + rng.gen_range(0..3);
            let burst = rng.gen_range(1..=9);
            let priority = rng.gen_range(0..8);
            specs.push(TaskSpec::new(id, arrival, burst).with_priority(priority));
            id += 1;
        }
    }
    specs
}

/// A mix of short interactive jobs and long batch jobs with a few urgent
/// system tasks; shaped to exercise multilevel classification
#[must_use]
pub fn mixed(seed: u64, count: usize) -> Vec<TaskSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let arrival = rng.gen_range(0..(count as Tick * 2));
            let (burst, priority) = match i % 4 {
                0 => (rng.gen_range(1..=4), rng.gen_range(0..=2)), // system
                1 | 2 => (rng.gen_range(1..=5), rng.gen_range(3..8)), // interactive
                _ => (rng.gen_range(10..=25), rng.gen_range(3..8)), // batch
            };
            TaskSpec::new(i as u32 + 1, arrival, burst).with_priority(priority)
        })
        .collect()
}
