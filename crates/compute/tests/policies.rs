//! Scheduling properties every policy must hold: each task of a round is
//! processed exactly once, the aggregate does not depend on the policy, and
//! stats read between rounds reflect exactly the rounds completed so far.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;

use partbench_compute::{
    run_experiment, AtomicQueued, Policy, PolicyKind, Preassigned, Queued, WorkerPool,
};
use partbench_core::{generate, Chunk, CostModel, Dataset, DatasetShape, ExperimentConfig, Task, Workload};

/// Records which worker thread processed which task id. Task ids are
/// encoded in `value`.
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, u64)>>,
}

impl Recorder {
    fn take(&self) -> Vec<(String, u64)> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

impl Workload for Recorder {
    fn process(&self, task: &Task) -> u32 {
        let worker = thread::current().name().unwrap_or("?").to_string();
        self.seen.lock().unwrap().push((worker, task.value as u64));
        task.value as u32
    }
}

fn tagged_chunk(first_id: usize, len: usize) -> Chunk {
    Chunk::new(
        (first_id..first_id + len)
            .map(|id| Task::new(id as f64, id % 5 == 0))
            .collect(),
    )
}

fn assert_exactly_once<P: Policy>(workers: usize, chunk_size: usize, rounds: usize) {
    let recorder = Arc::new(Recorder::default());
    let pool = WorkerPool::<P>::new(workers, chunk_size, Arc::clone(&recorder), false).unwrap();

    for round in 0..rounds {
        let first = round * chunk_size;
        pool.run_round(&tagged_chunk(first, chunk_size)).unwrap();

        let seen = recorder.take();
        let mut per_worker: HashMap<String, HashSet<u64>> = HashMap::new();
        for (worker, id) in &seen {
            assert!(
                per_worker.entry(worker.clone()).or_default().insert(*id),
                "{} processed task {id} twice",
                P::KIND
            );
        }

        let mut union = HashSet::new();
        for ids in per_worker.values() {
            for id in ids {
                assert!(union.insert(*id), "{}: task {id} claimed by two workers", P::KIND);
            }
        }
        let expected: HashSet<u64> = (first as u64..(first + chunk_size) as u64).collect();
        assert_eq!(union, expected, "{} round {round}", P::KIND);
    }
}

#[test]
fn every_task_processed_exactly_once() {
    assert_exactly_once::<Preassigned>(4, 64, 5);
    assert_exactly_once::<Queued>(4, 64, 5);
    assert_exactly_once::<AtomicQueued>(4, 64, 5);
}

#[test]
fn single_worker_degenerates_to_sequential() {
    assert_exactly_once::<Preassigned>(1, 13, 3);
    assert_exactly_once::<Queued>(1, 13, 3);
    assert_exactly_once::<AtomicQueued>(1, 13, 3);

    let recorder = Arc::new(Recorder::default());
    let pool = WorkerPool::<AtomicQueued>::new(1, 10, Arc::clone(&recorder), false).unwrap();
    pool.run_round(&tagged_chunk(0, 10)).unwrap();
    let order: Vec<u64> = recorder.take().into_iter().map(|(_, id)| id).collect();
    assert_eq!(order, (0..10).collect::<Vec<_>>());
}

#[test]
fn one_task_per_worker() {
    assert_exactly_once::<Preassigned>(4, 4, 3);
    assert_exactly_once::<Queued>(4, 4, 3);
    assert_exactly_once::<AtomicQueued>(4, 4, 3);

    let pool = WorkerPool::<Queued>::new(4, 4, Arc::new(CostModel::default()), false).unwrap();
    pool.run_round(&tagged_chunk(0, 4)).unwrap();
    assert!(pool.stats().iter().all(|s| s.round_tasks == 1));
}

#[test]
fn static_policies_assign_contiguous_subsets_by_worker_index() {
    fn check<P: Policy>() {
        let recorder = Arc::new(Recorder::default());
        let pool = WorkerPool::<P>::new(4, 16, Arc::clone(&recorder), false).unwrap();
        for _ in 0..3 {
            pool.run_round(&tagged_chunk(0, 16)).unwrap();
            for (worker, id) in recorder.take() {
                let index: u64 = worker.rsplit('-').next().unwrap().parse().unwrap();
                assert_eq!(id / 4, index, "{}: task {id} ran on {worker}", P::KIND);
            }
        }
    }
    check::<Preassigned>();
    check::<Queued>();
}

#[test]
fn cursor_claims_increase_within_each_worker() {
    let recorder = Arc::new(Recorder::default());
    let pool = WorkerPool::<AtomicQueued>::new(4, 400, Arc::clone(&recorder), false).unwrap();
    pool.run_round(&tagged_chunk(0, 400)).unwrap();

    let mut per_worker: HashMap<String, Vec<u64>> = HashMap::new();
    for (worker, id) in recorder.take() {
        per_worker.entry(worker).or_default().push(id);
    }
    for (worker, ids) in per_worker {
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "{worker}: {ids:?}");
    }
}

#[test]
fn aggregate_is_identical_across_policies() {
    for shape in DatasetShape::ALL {
        let config = ExperimentConfig {
            workers: 4,
            chunk_size: 128,
            chunk_count: 8,
            ..Default::default()
        };
        let dataset = generate(shape, 128, 8, 0.15, 1234).unwrap();
        let model = config.cost_model();
        let expected = dataset
            .iter()
            .fold(0u32, |acc, chunk| acc.wrapping_add(model.sum(chunk.iter())));

        for kind in PolicyKind::ALL {
            let report = run_experiment(kind, &dataset, &config, Arc::new(model)).unwrap();
            assert_eq!(report.result, expected, "{kind} on {shape}");
        }
    }
}

#[test]
fn sixteen_light_tasks_on_four_workers() {
    let tasks: Vec<Task> = (0..16).map(|i| Task::light(0.1 + i as f64 * 0.37)).collect();
    let model = CostModel::default();
    let expected = model.sum(&tasks);
    let dataset = Dataset::from_chunks(vec![Chunk::new(tasks)]).unwrap();
    let config = ExperimentConfig {
        workers: 4,
        chunk_size: 16,
        chunk_count: 1,
        ..Default::default()
    };

    for kind in PolicyKind::ALL {
        let report = run_experiment(kind, &dataset, &config, Arc::new(model)).unwrap();
        assert_eq!(report.result, expected, "{kind}");
    }
}

#[test]
fn heavy_counts_add_up_per_round() {
    fn check<P: Policy>(dataset: &Dataset) {
        let pool = WorkerPool::<P>::new(4, dataset.chunk_size(), Arc::new(CostModel::default()), true)
            .unwrap();
        let mut heavy_so_far = 0;
        for chunk in dataset {
            pool.run_round(chunk).unwrap();
            let stats = pool.stats();
            let round_heavy: usize = stats.iter().map(|s| s.round_heavy).sum();
            let round_tasks: usize = stats.iter().map(|s| s.round_tasks).sum();
            assert_eq!(round_heavy, chunk.heavy_count(), "{}", P::KIND);
            assert_eq!(round_tasks, chunk.len(), "{}", P::KIND);

            heavy_so_far += chunk.heavy_count();
            assert_eq!(stats.iter().map(|s| s.heavy_total).sum::<usize>(), heavy_so_far);
        }
    }
    let dataset = generate(DatasetShape::Random, 96, 10, 0.3, 77).unwrap();
    check::<Preassigned>(&dataset);
    check::<Queued>(&dataset);
    check::<AtomicQueued>(&dataset);
}

#[test]
fn accumulators_reflect_only_completed_rounds() {
    fn check<P: Policy>(dataset: &Dataset) {
        let model = CostModel::default();
        let pool = WorkerPool::<P>::new(2, dataset.chunk_size(), Arc::new(model), false).unwrap();
        let mut expected = 0u32;
        for (round, chunk) in dataset.iter().enumerate() {
            pool.run_round(chunk).unwrap();
            expected = expected.wrapping_add(model.sum(chunk.iter()));
            assert_eq!(pool.result(), expected, "{} after round {round}", P::KIND);
            assert!(pool.stats().iter().all(|s| s.rounds == round + 1));
        }
        pool.shutdown();
    }
    let dataset = generate(DatasetShape::Even, 32, 12, 0.2, 3).unwrap();
    check::<Preassigned>(&dataset);
    check::<Queued>(&dataset);
    check::<AtomicQueued>(&dataset);
}

#[test]
fn stacked_dataset_overloads_first_static_subset() {
    let dataset = generate(DatasetShape::Stacked, 16, 4, 0.25, 9).unwrap();
    for chunk in &dataset {
        assert_eq!(chunk.heavy_count(), 4);
        assert!(chunk[..4].iter().all(|t| t.heavy));
    }

    let pool =
        WorkerPool::<Preassigned>::new(4, 16, Arc::new(CostModel::default()), true).unwrap();
    for chunk in &dataset {
        pool.run_round(chunk).unwrap();
        let heavy: Vec<usize> = pool.stats().iter().map(|s| s.round_heavy).collect();
        assert_eq!(heavy, vec![4, 0, 0, 0]);
    }
}

#[test]
fn uneven_configurations_are_rejected() {
    let workload = Arc::new(CostModel::default());
    assert!(WorkerPool::<Preassigned>::new(3, 16, Arc::clone(&workload), false).is_err());
    assert!(WorkerPool::<Queued>::new(5, 16, Arc::clone(&workload), false).is_err());
    assert!(WorkerPool::<AtomicQueued>::new(6, 16, Arc::clone(&workload), false).is_err());

    let config = ExperimentConfig {
        workers: 3,
        chunk_size: 16,
        ..Default::default()
    };
    assert!(config.validate().is_err());
    let dataset = generate(DatasetShape::Even, 16, 1, 0.25, 0).unwrap();
    assert!(run_experiment(PolicyKind::AtomicQueued, &dataset, &config, workload).is_err());
}
