//! Ordered Recording Batch
//!
//! Collects the command lists of one frame. Lists are opened on the
//! coordinating thread, recorded concurrently on the [`WorkerPool`], and joined
//! exactly once. The joined batch is ordered by open sequence, never by the
//! order workers happened to finish in.
//!
//! A panic inside a stage body is caught at the job boundary, carried back
//! over the result channel and resumed on the coordinating thread after every
//! other job has reported, so a broken invariant halts the caller instead of
//! hanging the join.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::{StageId, StageReport, WorkerPool};
use crate::device::CommandList;
use crate::errors::StageError;

type Recorded = Result<(CommandList, StageReport), StageError>;

struct Completion {
    stage: StageId,
    result: Result<Recorded, Box<dyn Any + Send>>,
}

pub struct RecordingBatch {
    sender: flume::Sender<Completion>,
    receiver: flume::Receiver<Completion>,
    opened: Vec<(u64, StageId)>,
}

impl Default for RecordingBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBatch {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            opened: Vec::new(),
        }
    }

    /// Stages in the order their contexts were opened.
    pub fn opened(&self) -> impl Iterator<Item = StageId> + '_ {
        self.opened.iter().map(|&(_, stage)| stage)
    }

    /// Hands an opened list to the pool together with the body recording it.
    ///
    /// # Panics
    ///
    /// Panics if `list` was opened before a list already in the batch.
    pub fn spawn<F>(&mut self, pool: &WorkerPool, stage: StageId, list: CommandList, body: F)
    where
        F: FnOnce(&mut CommandList) -> Result<StageReport, StageError> + Send + 'static,
    {
        assert!(
            self.opened
                .last()
                .is_none_or(|&(sequence, _)| sequence < list.sequence()),
            "recording contexts must be spawned in open order"
        );
        self.opened.push((list.sequence(), stage));

        let sender = self.sender.clone();
        pool.execute(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(move || {
                let mut list = list;
                let report = body(&mut list)?;
                Ok((list.finish(), report))
            }));
            // The receiver lives until join; a send error means the batch was dropped.
            let _ = sender.send(Completion { stage, result });
        });
    }

    /// Waits for every spawned job. This is the only blocking point of a frame.
    ///
    /// # Panics
    ///
    /// Resumes the first panic raised by a stage body.
    #[must_use]
    pub fn join(self) -> JoinedBatch {
        let (joined, panicked) = self.collect();
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
        joined
    }

    /// Waits for every spawned job and throws away what they recorded.
    ///
    /// Stage panics are logged instead of resumed, so this is safe to call
    /// while the coordinator is already unwinding.
    pub fn discard(self) {
        let (joined, panicked) = self.collect();
        log::warn!(
            "Discarded {} recorded list(s){}",
            joined.recorded.len(),
            if panicked.is_some() { " after a stage panic" } else { "" }
        );
    }

    fn collect(self) -> (JoinedBatch, Option<Box<dyn Any + Send>>) {
        let expected = self.opened.len();
        let mut recorded = Vec::with_capacity(expected);
        let mut failures = Vec::new();
        let mut completion_order = Vec::with_capacity(expected);
        let mut panicked = None;

        for _ in 0..expected {
            let Ok(completion) = self.receiver.recv() else {
                break;
            };
            completion_order.push(completion.stage);
            match completion.result {
                Ok(Ok((list, report))) => recorded.push((completion.stage, list, report)),
                Ok(Err(err)) => failures.push(err),
                Err(payload) => {
                    log::error!("Stage {} panicked while recording", completion.stage.name());
                    panicked.get_or_insert(payload);
                }
            }
        }

        recorded.sort_by_key(|(_, list, _): &(StageId, CommandList, StageReport)| list.sequence());
        failures.sort_by_key(|err: &StageError| err.stage.order());

        let joined = JoinedBatch {
            recorded,
            failures,
            completion_order,
        };
        (joined, panicked)
    }
}

/// Every recorded list of a frame, in submission order.
#[derive(Debug)]
pub struct JoinedBatch {
    pub recorded: Vec<(StageId, CommandList, StageReport)>,
    pub failures: Vec<StageError>,
    /// Order in which jobs reported back.
    pub completion_order: Vec<StageId>,
}

impl JoinedBatch {
    #[must_use]
    pub fn submission_order(&self) -> Vec<StageId> {
        self.recorded.iter().map(|(stage, _, _)| *stage).collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
