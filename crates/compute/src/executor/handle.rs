use crossbeam_channel::{Receiver, TryRecvError};

use crate::error::JobError;

/// The receiving end of one job's result.
///
/// Joining consumes the handle, so each result is observed at most once.
#[derive(Debug)]
pub struct JobHandle<T> {
    rx: Receiver<Result<T, JobError>>,
    /// Outcome already pulled off the channel by `is_finished`.
    ready: Option<Result<T, JobError>>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(rx: Receiver<Result<T, JobError>>) -> Self {
        Self { rx, ready: None }
    }

    /// Block until the job finishes.
    ///
    /// Returns [`JobError::Disconnected`] if the pool was torn down before
    /// the job ran.
    pub fn join(self) -> Result<T, JobError> {
        match self.ready {
            Some(result) => result,
            None => self.rx.recv().unwrap_or(Err(JobError::Disconnected)),
        }
    }

    /// Take the result if it is ready, otherwise give the handle back.
    pub fn try_join(mut self) -> Result<Result<T, JobError>, Self> {
        if self.is_finished() {
            Ok(self.join())
        } else {
            Err(self)
        }
    }

    /// Whether `join` would return without blocking, including when the
    /// job was dropped unstarted.
    pub fn is_finished(&mut self) -> bool {
        if self.ready.is_none() {
            self.ready = match self.rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Disconnected) => Some(Err(JobError::Disconnected)),
                Err(TryRecvError::Empty) => None,
            };
        }
        self.ready.is_some()
    }
}
