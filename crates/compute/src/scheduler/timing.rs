use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::metrics::ChunkTiming;
use crate::error::SchedulerError;

/// Destination for per-chunk timing records.
pub trait TimingSink {
    fn write_timings(&mut self, records: &[ChunkTiming]) -> Result<(), SchedulerError>;
}

/// Comma-separated timings, one row per chunk.
///
/// Header: `work_i,idle_i,heavy_i,` for every worker, then
/// `chunktime,total_idle,total_heavy`. Times are seconds.
pub struct CsvTimingSink<W: Write> {
    out: W,
    workers: usize,
}

impl CsvTimingSink<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path, workers: usize) -> Result<Self, SchedulerError> {
        Ok(Self::new(BufWriter::new(File::create(path)?), workers))
    }
}

impl<W: Write> CsvTimingSink<W> {
    pub fn new(out: W, workers: usize) -> Self {
        Self { out, workers }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_header(&mut self) -> std::io::Result<()> {
        for i in 0..self.workers {
            write!(self.out, "work_{i},idle_{i},heavy_{i},")?;
        }
        writeln!(self.out, "chunktime,total_idle,total_heavy")
    }

    fn write_row(&mut self, record: &ChunkTiming) -> std::io::Result<()> {
        for i in 0..self.workers {
            write!(
                self.out,
                "{},{},{},",
                record.active[i].as_secs_f64(),
                record.idle(i).as_secs_f64(),
                record.heavy[i]
            )?;
        }
        writeln!(
            self.out,
            "{},{},{}",
            record.total.as_secs_f64(),
            record.total_idle().as_secs_f64(),
            record.total_heavy()
        )
    }
}

impl<W: Write> TimingSink for CsvTimingSink<W> {
    fn write_timings(&mut self, records: &[ChunkTiming]) -> Result<(), SchedulerError> {
        self.write_header()?;
        for record in records {
            if record.active.len() != self.workers {
                return Err(SchedulerError::InvalidPool(format!(
                    "timing record has {} workers, sink expects {}",
                    record.active.len(),
                    self.workers
                )));
            }
            self.write_row(record)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
