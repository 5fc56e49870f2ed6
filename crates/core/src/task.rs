use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// A single unit of synthetic work.
///
/// The numeric content is irrelevant; only its cost class matters. `heavy`
/// selects which iteration count [`CostModel`] burns on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub value: f64,
    pub heavy: bool,
}

impl Task {
    pub fn new(value: f64, heavy: bool) -> Self {
        Self { value, heavy }
    }

    pub fn light(value: f64) -> Self {
        Self::new(value, false)
    }

    pub fn heavy(value: f64) -> Self {
        Self::new(value, true)
    }
}

/// Evaluates tasks on a worker thread.
///
/// Implementations must be pure with respect to the task: the same task
/// always yields the same result, whichever worker evaluates it.
pub trait Workload: Send + Sync + 'static {
    fn process(&self, task: &Task) -> u32;
}

/// The bimodal CPU burner: light tasks iterate `light_iterations` times,
/// heavy ones `heavy_iterations` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    pub light_iterations: usize,
    pub heavy_iterations: usize,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            light_iterations: 2,
            heavy_iterations: 20,
        }
    }
}

impl CostModel {
    pub fn new(light_iterations: usize, heavy_iterations: usize) -> Self {
        Self {
            light_iterations,
            heavy_iterations,
        }
    }

    pub fn iterations_for(&self, task: &Task) -> usize {
        if task.heavy {
            self.heavy_iterations
        } else {
            self.light_iterations
        }
    }

    /// Sum of [`Workload::process`] over `tasks`, in wrapping arithmetic.
    pub fn sum<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> u32 {
        tasks
            .into_iter()
            .fold(0u32, |acc, task| acc.wrapping_add(self.process(task)))
    }
}

impl Workload for CostModel {
    fn process(&self, task: &Task) -> u32 {
        let mut intermediate = task.value;
        for _ in 0..self.iterations_for(task) {
            let digits = ((intermediate.cos() * PI).sin().abs() * 10_000_000.0) as u32 % 100_000;
            intermediate = f64::from(digits) / 10_000.0;
        }
        intermediate.exp() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_is_deterministic() {
        let model = CostModel::default();
        let task = Task::heavy(1.234);
        assert_eq!(model.process(&task), model.process(&task));
    }

    #[test]
    fn zero_iterations_is_exp_of_value() {
        let model = CostModel::new(0, 0);
        assert_eq!(model.process(&Task::light(2.0)), 2.0f64.exp() as u32);
        assert_eq!(model.process(&Task::heavy(0.0)), 1);
    }

    #[test]
    fn iterations_follow_cost_class() {
        let model = CostModel::new(3, 30);
        assert_eq!(model.iterations_for(&Task::light(1.0)), 3);
        assert_eq!(model.iterations_for(&Task::heavy(1.0)), 30);
    }

    #[test]
    fn result_is_bounded_by_digit_range() {
        // digits < 100_000, so the intermediate stays below 10 and exp() below e^10.
        let model = CostModel::default();
        let bound = 10.0f64.exp() as u32;
        for i in 0..200 {
            let task = Task::new(i as f64 * 0.031, i % 3 == 0);
            assert!(model.process(&task) <= bound);
        }
    }

    #[test]
    fn sum_matches_per_task_results() {
        let model = CostModel::default();
        let tasks: Vec<Task> = (0..16).map(|i| Task::light(i as f64 * 0.25)).collect();
        let expected: u64 = tasks.iter().map(|t| u64::from(model.process(t))).sum();
        assert_eq!(u64::from(model.sum(&tasks)), expected);
    }
}
