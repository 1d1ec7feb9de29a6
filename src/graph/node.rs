//! Stage Node Trait
//!
//! Defines the interface of one stage body in the frame graph.

use std::sync::Arc;

use super::{StageContext, StageId};
use crate::device::{CommandList, TextureHandle};
use crate::errors::StageError;
use crate::postprocess::ChainSummary;

/// Data a stage hands back to the coordinator besides its commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Set by the stage that recorded the postprocess chain.
    pub postprocess: Option<ChainSummary>,
    /// Debug visualisation written this frame, if any.
    pub debug_output: Option<TextureHandle>,
}

/// A stage body.
///
/// # Design Principles
/// - `admit` is evaluated on the coordinating thread, before the recording
///   context is opened. A rejected stage records nothing and opens no context.
/// - `record` runs on a worker. It only reads the shared [`StageContext`] and
///   writes its own [`CommandList`]; any resource transition it depends on is
///   an explicit barrier in that list.
/// - A returned [`StageError`] abandons the whole frame.
pub trait StageNode: Send + Sync {
    fn id(&self) -> StageId;

    /// Admission predicate: feature flags plus data-dependent conditions.
    fn admit(&self, _ctx: &StageContext) -> bool {
        true
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError>;
}

pub type SharedStageNode = Arc<dyn StageNode>;
