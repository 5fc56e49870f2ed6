//! Synthetic dataset generation.
//!
//! A [`Dataset`] is an ordered list of fixed-length [`Chunk`]s, generated once
//! before an experiment and read-only afterwards. Chunks share their tasks
//! through an `Arc`, so handing a chunk to a worker never copies tasks.

use std::f64::consts::TAU;
use std::fmt;
use std::ops::{Deref, Range};
use std::str::FromStr;
use std::sync::Arc;

use rand::distr::{Bernoulli, Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BenchError, Result};
use crate::task::Task;

/// How heavy tasks are distributed inside each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetShape {
    /// Each task is heavy with independent probability.
    Random,
    /// Heavy tasks are spread at a regular stride.
    Even,
    /// Same counts as `Even`, but all heavy tasks packed at the front.
    Stacked,
}

impl DatasetShape {
    pub const ALL: [DatasetShape; 3] = [Self::Random, Self::Even, Self::Stacked];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Even => "even",
            Self::Stacked => "stacked",
        }
    }
}

impl fmt::Display for DatasetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetShape {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "even" => Ok(Self::Even),
            "stacked" => Ok(Self::Stacked),
            other => Err(BenchError::UnknownShape(other.to_string())),
        }
    }
}

/// One round's batch of tasks. Cloning is a reference-count bump.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk(Arc<[Task]>);

impl Chunk {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self(tasks.into())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.0
    }

    /// Contiguous sub-slice used by the static partitioners.
    pub fn subset(&self, range: Range<usize>) -> &[Task] {
        &self.0[range]
    }

    pub fn heavy_count(&self) -> usize {
        self.0.iter().filter(|t| t.heavy).count()
    }
}

impl Deref for Chunk {
    type Target = [Task];

    fn deref(&self) -> &[Task] {
        &self.0
    }
}

impl From<Vec<Task>> for Chunk {
    fn from(tasks: Vec<Task>) -> Self {
        Self::new(tasks)
    }
}

/// All chunks of one run, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    chunks: Vec<Chunk>,
}

impl Dataset {
    /// Build a dataset from pre-made chunks. All chunks must share one length.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        if let Some(first) = chunks.first() {
            let size = first.len();
            if let Some(bad) = chunks.iter().position(|c| c.len() != size) {
                return Err(BenchError::Config(format!(
                    "chunk {bad} has {} tasks, expected {size}",
                    chunks[bad].len()
                )));
            }
        }
        Ok(Self { chunks })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Tasks per chunk (0 for an empty dataset).
    pub fn chunk_size(&self) -> usize {
        self.chunks.first().map_or(0, |c| c.len())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn task_count(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }

    pub fn heavy_count(&self) -> usize {
        self.chunks.iter().map(Chunk::heavy_count).sum()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Generate `chunk_count` chunks of `chunk_size` tasks.
///
/// Every chunk draws from its own RNG seeded by `seed` and the chunk index,
/// so the output depends only on the arguments, not on how rayon schedules
/// the generation.
pub fn generate(
    shape: DatasetShape,
    chunk_size: usize,
    chunk_count: usize,
    heavy_probability: f64,
    seed: u64,
) -> Result<Dataset> {
    if !(0.0..=1.0).contains(&heavy_probability) {
        return Err(BenchError::Config(format!(
            "heavy probability must be within [0, 1], got {heavy_probability}"
        )));
    }
    let values = Uniform::new(0.0, TAU)
        .map_err(|e| BenchError::Config(format!("value distribution: {e}")))?;
    let bernoulli = Bernoulli::new(heavy_probability)
        .map_err(|e| BenchError::Config(format!("heavy distribution: {e}")))?;

    let chunks: Vec<Chunk> = (0..chunk_count)
        .into_par_iter()
        .map(|index| {
            let mut rng = chunk_rng(seed, index);
            let tasks = match shape {
                DatasetShape::Random => (0..chunk_size)
                    .map(|_| Task::new(values.sample(&mut rng), bernoulli.sample(&mut rng)))
                    .collect(),
                DatasetShape::Even => even_chunk(&mut rng, &values, chunk_size, heavy_probability),
                DatasetShape::Stacked => {
                    stack_heavy_first(even_chunk(&mut rng, &values, chunk_size, heavy_probability))
                }
            };
            Chunk::new(tasks)
        })
        .collect();

    debug!(
        shape = %shape,
        chunk_size,
        chunk_count,
        heavy_probability,
        "dataset generated"
    );
    Dataset::from_chunks(chunks)
}

fn chunk_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add((index as u64) << 32))
}

/// Heavy flag driven by an accumulator: each task adds `p`, and the task
/// that pushes the accumulator to 1 is heavy.
fn even_chunk(
    rng: &mut StdRng,
    values: &Uniform<f64>,
    chunk_size: usize,
    heavy_probability: f64,
) -> Vec<Task> {
    let mut acc = 0.0;
    (0..chunk_size)
        .map(|_| {
            acc += heavy_probability;
            let heavy = acc >= 1.0;
            if heavy {
                acc -= 1.0;
            }
            Task::new(values.sample(rng), heavy)
        })
        .collect()
}

/// Stable partition: heavy tasks first, relative order kept on both sides.
fn stack_heavy_first(tasks: Vec<Task>) -> Vec<Task> {
    let (mut heavy, light): (Vec<Task>, Vec<Task>) = tasks.into_iter().partition(|t| t.heavy);
    heavy.extend(light);
    heavy
}
