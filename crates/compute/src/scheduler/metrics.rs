use std::time::Duration;

use serde::Serialize;

/// Per-worker accumulator.
///
/// Owned by its worker thread while a round runs; the pool only hands out
/// copies after the round's completion has been observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Running wrapping sum of every task result this worker produced.
    pub accumulation: u32,
    /// Rounds this worker has reported done.
    pub rounds: usize,
    /// Tasks processed across all rounds.
    pub tasks_total: usize,
    /// Heavy tasks processed across all rounds.
    pub heavy_total: usize,
    /// Tasks processed in the most recent round.
    pub round_tasks: usize,
    /// Heavy tasks processed in the most recent round.
    pub round_heavy: usize,
    /// Time spent processing in the most recent round. Zero unless measuring.
    pub round_active: Duration,
    /// Panic message if the workload panicked during the most recent round.
    /// The round's tally then only covers the tasks visited before it.
    pub round_panic: Option<String>,
}

/// What a worker tallied during one round, folded into [`WorkerStats`]
/// before it reports done.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RoundTally {
    pub sum: u32,
    pub tasks: usize,
    pub heavy: usize,
}

impl RoundTally {
    #[inline]
    pub fn add(&mut self, result: u32, heavy: bool) {
        self.sum = self.sum.wrapping_add(result);
        self.tasks += 1;
        self.heavy += usize::from(heavy);
    }
}

impl WorkerStats {
    pub(crate) fn finish_round(
        &mut self,
        tally: RoundTally,
        active: Duration,
        panic: Option<String>,
    ) {
        self.accumulation = self.accumulation.wrapping_add(tally.sum);
        self.rounds += 1;
        self.tasks_total += tally.tasks;
        self.heavy_total += tally.heavy;
        self.round_tasks = tally.tasks;
        self.round_heavy = tally.heavy;
        self.round_active = active;
        self.round_panic = panic;
    }
}

/// Timing record for one chunk, one entry per worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkTiming {
    pub active: Vec<Duration>,
    pub heavy: Vec<usize>,
    pub total: Duration,
}

impl ChunkTiming {
    pub fn from_stats(stats: &[WorkerStats], total: Duration) -> Self {
        Self {
            active: stats.iter().map(|s| s.round_active).collect(),
            heavy: stats.iter().map(|s| s.round_heavy).collect(),
            total,
        }
    }

    /// Time worker `i` spent waiting on the others this round.
    pub fn idle(&self, i: usize) -> Duration {
        self.total.saturating_sub(self.active[i])
    }

    pub fn total_idle(&self) -> Duration {
        (0..self.active.len()).map(|i| self.idle(i)).sum()
    }

    pub fn total_heavy(&self) -> usize {
        self.heavy.iter().sum()
    }
}
