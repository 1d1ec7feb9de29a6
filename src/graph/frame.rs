//! Frame Graph Executor
//!
//! `FrameGraph` owns the stage nodes of a 3D frame and drives one frame
//! through them:
//!
//! 1. Admission is evaluated for every stage on the coordinating thread.
//! 2. A recording context is opened for each admitted stage, in stage order.
//!    Opening order fixes the submission order.
//! 3. Stage bodies record concurrently on the [`WorkerPool`].
//! 4. [`PendingFrame::complete`] joins the batch. If any stage failed the
//!    frame is abandoned and nothing is submitted; otherwise the lists are
//!    submitted as one ordered batch.

use std::sync::Arc;

use super::stages::standard_stages;
use super::{RecordingBatch, SharedStageNode, StageContext, StageId, StageReport, WorkerPool};
use crate::device::GraphicsDevice;
use crate::errors::{Result, StageError};

/// What happened to a frame's command lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Every admitted stage recorded; the batch reached the device.
    Submitted,
    /// At least one stage failed. Nothing was submitted.
    Abandoned(Vec<StageError>),
}

/// Result of one [`FrameGraph::execute`] call.
#[derive(Debug, Clone)]
pub struct FrameExecution {
    pub outcome: FrameOutcome,
    /// Admitted stages, in the order their contexts were opened.
    pub admitted: Vec<StageId>,
    /// Stages whose lists were submitted, in submission order.
    pub submitted: Vec<StageId>,
    /// Order in which stage bodies finished recording.
    pub completion_order: Vec<StageId>,
    /// Reports of every stage that recorded successfully, in stage order.
    pub reports: Vec<(StageId, StageReport)>,
}

impl FrameExecution {
    #[inline]
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.outcome == FrameOutcome::Submitted
    }

    /// Report of `stage`, if it recorded this frame.
    #[must_use]
    pub fn report(&self, stage: StageId) -> Option<&StageReport> {
        self.reports
            .iter()
            .find_map(|(id, report)| (*id == stage).then_some(report))
    }
}

/// Fixed, ordered set of stage nodes.
pub struct FrameGraph {
    nodes: Vec<SharedStageNode>,
}

impl Default for FrameGraph {
    fn default() -> Self {
        Self::standard()
    }
}

impl FrameGraph {
    /// The built-in stages of the 3D render path.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            nodes: standard_stages(),
        }
    }

    /// Swaps in `node` for the stage with the same id.
    ///
    /// Returns the node it replaced.
    pub fn replace(&mut self, node: SharedStageNode) -> Option<SharedStageNode> {
        let slot = self.nodes.iter_mut().find(|n| n.id() == node.id())?;
        Some(std::mem::replace(slot, node))
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Runs one frame. Blocks until every admitted stage has recorded.
    ///
    /// # Errors
    ///
    /// Only device submission failures surface as errors. A stage failure is
    /// reported through [`FrameOutcome::Abandoned`].
    pub fn execute(
        &self,
        ctx: &Arc<StageContext>,
        device: &dyn GraphicsDevice,
        pool: &WorkerPool,
    ) -> Result<FrameExecution> {
        self.dispatch(ctx, device, pool).complete(device)
    }

    /// Evaluates admission, opens one recording context per admitted stage in
    /// stage order and hands every body to `pool`. Does not block.
    #[must_use]
    pub fn dispatch(
        &self,
        ctx: &Arc<StageContext>,
        device: &dyn GraphicsDevice,
        pool: &WorkerPool,
    ) -> PendingFrame {
        let mut batch = RecordingBatch::new();

        for node in &self.nodes {
            let id = node.id();
            if !node.admit(ctx) {
                log::debug!("Stage {} not admitted", id.name());
                continue;
            }

            let list = device.begin_command_list(id.name());
            let node = Arc::clone(node);
            let ctx = Arc::clone(ctx);
            batch.spawn(pool, id, list, move |list| node.record(&ctx, list));
        }

        let admitted = batch.opened().collect();
        PendingFrame { batch, admitted }
    }
}

/// A frame whose stage bodies are recording.
pub struct PendingFrame {
    batch: RecordingBatch,
    admitted: Vec<StageId>,
}

impl PendingFrame {
    /// Admitted stages, in the order their contexts were opened.
    #[must_use]
    pub fn admitted(&self) -> &[StageId] {
        &self.admitted
    }

    /// Joins every stage body and submits nothing.
    pub fn abandon(self) {
        self.batch.discard();
    }

    /// Joins every stage body, then submits the lists in open order, or
    /// abandons the frame if any stage failed.
    pub fn complete(self, device: &dyn GraphicsDevice) -> Result<FrameExecution> {
        let Self { batch, admitted } = self;
        let joined = batch.join();
        let completion_order = joined.completion_order.clone();

        if !joined.is_complete() {
            for failure in &joined.failures {
                log::error!("Frame abandoned: {failure}");
            }
            return Ok(FrameExecution {
                outcome: FrameOutcome::Abandoned(joined.failures),
                admitted,
                submitted: Vec::new(),
                completion_order,
                reports: Vec::new(),
            });
        }

        let mut submitted = Vec::with_capacity(joined.recorded.len());
        let mut lists = Vec::with_capacity(joined.recorded.len());
        let mut reports = Vec::with_capacity(joined.recorded.len());
        for (stage, list, report) in joined.recorded {
            submitted.push(stage);
            lists.push(list);
            reports.push((stage, report));
        }

        device.submit(lists)?;

        Ok(FrameExecution {
            outcome: FrameOutcome::Submitted,
            admitted,
            submitted,
            completion_order,
            reports,
        })
    }
}
