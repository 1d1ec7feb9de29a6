//! Frame Stage Graph
//!
//! Provides:
//! - [`StageId`]: the fixed stage order of a frame
//! - [`StageNode`]: one stage body with its admission predicate
//! - [`StageContext`]: the immutable per-frame data every stage reads
//! - [`WorkerPool`] / [`RecordingBatch`]: concurrent recording with ordered join
//! - [`FrameGraph`]: admission, recording and ordered submission of one frame

mod batch;
mod context;
mod frame;
mod node;
mod pool;
mod stage;
pub mod stages;

pub use batch::{JoinedBatch, RecordingBatch};
pub use context::StageContext;
pub use frame::{FrameExecution, FrameGraph, FrameOutcome, PendingFrame};
pub use node::{SharedStageNode, StageNode, StageReport};
pub use pool::WorkerPool;
pub use stage::StageId;
