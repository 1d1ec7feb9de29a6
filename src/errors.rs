//! Error Types
//!
//! This module defines the error types used by the render path.
//!
//! # Overview
//!
//! [`RenderPathError`] covers construction-time and frame-level failures:
//! - Invalid resolution or unsupported MSAA sample count
//! - Resource creation failures during provisioning (always fatal)
//! - Submission failures reported by the device backend
//! - Configuration parse errors
//!
//! [`StageError`] is the stage-local failure raised while a stage records its
//! commands. It never escapes the frame: the orchestrator discards the whole
//! frame and reports it as abandoned.
//!
//! Internal invariant violations (mip/subresource index mismatch, unbalanced
//! barriers, double postprocess overrides) are not errors. They halt through
//! assertions because they signal divergence between the resource graph and
//! its consumers.

use thiserror::Error;

use crate::device::TextureHandle;
use crate::graph::StageId;

/// The main error type for the render path.
#[derive(Error, Debug)]
pub enum RenderPathError {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// Internal resolution must be positive in both dimensions.
    #[error("Invalid internal resolution: {width}x{height}")]
    InvalidResolution {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// The device does not support the requested MSAA sample count.
    #[error("Unsupported MSAA sample count: {0}")]
    UnsupportedSampleCount(u32),

    /// The device could not create a resource with the requested format/usage.
    #[error("Failed to create resource '{label}': {reason}")]
    ResourceCreation {
        /// Debug label of the resource
        label: &'static str,
        /// Backend-provided reason
        reason: String,
    },

    /// A handle did not refer to a live texture.
    #[error("Unknown texture handle: {0:?}")]
    UnknownTexture(TextureHandle),

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Reprovisioning was requested while a frame's tasks were outstanding.
    #[error("Cannot resize while a frame is in flight")]
    ResizeWhileFrameInFlight,

    /// A frame was started while another one was still recording.
    #[error("A frame is already in flight")]
    FrameInFlight,

    /// The last provisioning attempt failed; no resources are live.
    #[error("Render path has no provisioned resources")]
    NotProvisioned,

    /// The device rejected a command batch.
    #[error("Submission failed: {0}")]
    Submission(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Stage-local recording failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Stage {stage:?} failed: {reason}")]
pub struct StageError {
    /// The stage whose recording was aborted.
    pub stage: StageId,
    /// Human readable reason.
    pub reason: String,
}

impl StageError {
    #[must_use]
    pub fn new(stage: StageId, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, RenderPathError>`.
pub type Result<T> = std::result::Result<T, RenderPathError>;
