//! 3D Render Path
//!
//! [`RenderPath3D`] is the frame orchestrator. It owns the provisioned
//! resources, the cross-frame rotator, the stage graph and the worker pool,
//! and drives the per-tick cycle:
//!
//! ```text
//! update(dt)    scene update, depth-history rotation, jitter, visibility
//!     │         (FrameState frozen here)
//!     ▼
//! render()      admission → ordered context open → concurrent recording
//!               → single join → ordered submission (or abandoned frame)
//! ```
//!
//! [`RenderPath3D::render`] is [`begin_frame`](RenderPath3D::begin_frame)
//! followed by [`end_frame`](RenderPath3D::end_frame). Between the two the
//! frame is in flight and [`resize`](RenderPath3D::resize) is refused.
//! Dropping the [`FrameInFlight`] instead abandons the frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec2;

use crate::device::{GraphicsDevice, TextureHandle};
use crate::errors::{RenderPathError, Result};
use crate::graph::{
    FrameGraph, FrameOutcome, PendingFrame, SharedStageNode, StageContext, StageId, WorkerPool,
};
use crate::postprocess::ChainSummary;
use crate::provisioner::{ProvisionedResources, ResourceProvisioner};
use crate::resources::{PlaceholderTextures, Resolution, TargetId};
use crate::rotation::{BufferRotator, BufferSlot, FrameParityPair};
use crate::scene::{Camera, FrameState, SceneProvider, VisibilityFlags, temporal_jitter};
use crate::settings::RenderPathSettings;

/// Summary of one rendered frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_index: u64,
    pub outcome: FrameOutcome,
    /// Stages admitted this frame, in stage order.
    pub executed: Vec<StageId>,
    /// Stages whose lists reached the device, in submission order.
    pub submission_order: Vec<StageId>,
    /// Order in which stage bodies finished recording.
    pub completion_order: Vec<StageId>,
    /// Postprocess chain of this frame, if it was submitted.
    pub postprocess: Option<ChainSummary>,
    pub debug_output: Option<TextureHandle>,
}

/// A frame whose stages are recording. Hand it back to
/// [`RenderPath3D::end_frame`].
///
/// Dropping it instead joins the stages, submits nothing and releases the
/// path for the next frame.
#[must_use = "an unfinished frame is abandoned when dropped"]
pub struct FrameInFlight {
    frame_index: u64,
    pending: Option<PendingFrame>,
    in_flight: Arc<AtomicBool>,
}

impl FrameInFlight {
    #[must_use]
    pub fn admitted(&self) -> &[StageId] {
        self.pending.as_ref().map_or(&[][..], |pending| pending.admitted())
    }
}

impl Drop for FrameInFlight {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::warn!(
                "Frame {} dropped before end_frame, abandoning it",
                self.frame_index
            );
            pending.abandon();
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

pub struct RenderPath3D {
    device: Arc<dyn GraphicsDevice>,
    scene: Box<dyn SceneProvider>,
    settings: Arc<RenderPathSettings>,

    provisioner: ResourceProvisioner,
    resources: Option<Arc<ProvisionedResources>>,
    placeholders: PlaceholderTextures,
    rotator: BufferRotator,
    resolution: Resolution,

    graph: FrameGraph,
    pool: WorkerPool,

    camera: Camera,
    frame: Arc<FrameState>,
    frame_index: u64,
    in_flight: Arc<AtomicBool>,

    color_grading_lut: Option<TextureHandle>,
    last_postprocess: Option<ChainSummary>,
    debug_output: Option<TextureHandle>,
}

impl RenderPath3D {
    /// Creates placeholders and provisions every resolution-dependent resource.
    ///
    /// The MSAA sample count is taken from `settings.msaa_samples`.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        scene: Box<dyn SceneProvider>,
        settings: RenderPathSettings,
        resolution: Resolution,
        pool: WorkerPool,
    ) -> Result<Self> {
        let placeholders = PlaceholderTextures::create(device.as_ref())?;
        let mut provisioner = ResourceProvisioner::new(Arc::clone(&device));
        let resources = match provisioner.provision(
            resolution,
            settings.msaa_samples,
            device.capabilities(),
        ) {
            Ok(resources) => resources,
            Err(err) => {
                placeholders.release(device.as_ref());
                return Err(err);
            }
        };
        let rotator = build_rotator(&resources);

        let mut camera = Camera::default();
        camera.aspect = resolution.width() as f32 / resolution.height() as f32;
        camera.update_projection_matrix();

        let frame = Arc::new(FrameState {
            frame_index: 0,
            delta_time: 0.0,
            camera,
            previous_camera: camera,
            reflection_camera: None,
            visibility: Default::default(),
            reflection_visibility: None,
            sun_direction: None,
        });

        log::info!(
            "Render path created at {}x{} with {} worker(s)",
            resolution.width(),
            resolution.height(),
            pool.worker_count()
        );

        Ok(Self {
            device,
            scene,
            settings: Arc::new(settings),
            provisioner,
            resources: Some(Arc::new(resources)),
            placeholders,
            rotator,
            resolution,
            graph: FrameGraph::standard(),
            pool,
            camera,
            frame,
            frame_index: 0,
            in_flight: Arc::new(AtomicBool::new(false)),
            color_grading_lut: None,
            last_postprocess: None,
            debug_output: None,
        })
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Reprovisions every resolution-dependent resource.
    ///
    /// Picks up the current `msaa_samples` setting. An unsupported sample
    /// count leaves the previous resources in place. A creation failure
    /// leaves none, and [`render`](Self::render) refuses to run until a later
    /// resize succeeds.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.is_frame_in_flight() {
            return Err(RenderPathError::ResizeWhileFrameInFlight);
        }
        let resolution = Resolution::new(width, height)?;

        let resources = match self.provisioner.provision(
            resolution,
            self.settings.msaa_samples,
            self.device.capabilities(),
        ) {
            Ok(resources) => resources,
            Err(err) => {
                // A rejected sample count leaves the old set allocated.
                if self.provisioner.owned().is_empty() {
                    self.resources = None;
                }
                return Err(err);
            }
        };

        self.rotator = build_rotator(&resources);
        self.resources = Some(Arc::new(resources));
        self.resolution = resolution;
        self.camera.aspect = width as f32 / height as f32;
        self.camera.update_projection_matrix();
        Ok(())
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[must_use]
    pub fn resources(&self) -> Option<&ProvisionedResources> {
        self.resources.as_deref()
    }

    #[must_use]
    pub fn placeholders(&self) -> &PlaceholderTextures {
        &self.placeholders
    }

    #[must_use]
    pub fn rotator(&self) -> &BufferRotator {
        &self.rotator
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Runs the update phase of one tick and freezes the resulting
    /// [`FrameState`] for the next [`render`](Self::render).
    pub fn update(&mut self, dt: f32) {
        let previous_camera = self.frame.camera;

        self.scene.update(dt);
        self.rotator.on_update();
        self.frame_index += 1;

        let jitter = if self.settings.temporal_aa {
            temporal_jitter(
                self.frame_index,
                self.resolution.width(),
                self.resolution.height(),
            )
        } else {
            Vec2::ZERO
        };
        self.camera.set_jitter(jitter);

        let mut flags = VisibilityFlags::EVERYTHING;
        if !self.settings.reflections {
            flags.remove(VisibilityFlags::REQUEST_REFLECTION);
        }
        let layer_mask = self.settings.layer_mask;
        let visibility = self.scene.visibility(&self.camera, layer_mask, flags);

        let (reflection_camera, reflection_visibility) = match visibility.reflection_plane {
            Some(plane) if self.settings.reflections => {
                let camera = self.camera.reflected(plane);
                let visibility = self.scene.visibility(
                    &camera,
                    layer_mask,
                    VisibilityFlags::OBJECTS | VisibilityFlags::LIGHTS,
                );
                (Some(camera), Some(visibility))
            }
            _ => (None, None),
        };

        self.frame = Arc::new(FrameState {
            frame_index: self.frame_index,
            delta_time: dt,
            camera: self.camera,
            previous_camera,
            reflection_camera,
            visibility,
            reflection_visibility,
            sun_direction: self.scene.sun_direction(),
        });
    }

    #[must_use]
    pub fn frame_state(&self) -> &FrameState {
        &self.frame
    }

    // ========================================================================
    // Render
    // ========================================================================

    /// Records and submits one frame. Blocks once, at the join.
    pub fn render(&mut self) -> Result<FrameReport> {
        let frame = self.begin_frame()?;
        self.end_frame(frame)
    }

    /// Opens the frame's recording contexts and dispatches every admitted
    /// stage without waiting for them.
    pub fn begin_frame(&mut self) -> Result<FrameInFlight> {
        if self.is_frame_in_flight() {
            return Err(RenderPathError::FrameInFlight);
        }
        let resources = self.resources.clone().ok_or(RenderPathError::NotProvisioned)?;

        let ctx = Arc::new(StageContext {
            frame: Arc::clone(&self.frame),
            settings: Arc::clone(&self.settings),
            resources,
            placeholders: self.placeholders,
            capabilities: self.device.capabilities().clone(),
            rotator: self.rotator,
            color_grading_lut: self.color_grading_lut,
            frame_counter: self.device.frame_count(),
        });

        let pending = self.graph.dispatch(&ctx, self.device.as_ref(), &self.pool);
        log::debug!(
            "Frame {} dispatched: {:?}",
            self.frame_index,
            pending.admitted()
        );
        self.in_flight.store(true, Ordering::Release);
        Ok(FrameInFlight {
            frame_index: self.frame_index,
            pending: Some(pending),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Joins `frame` and submits it, or abandons it if a stage failed.
    ///
    /// The path is released once this returns, even if a stage panicked.
    pub fn end_frame(&mut self, mut frame: FrameInFlight) -> Result<FrameReport> {
        let frame_index = frame.frame_index;
        let pending = frame.pending.take();
        // Unwinding out of `complete` still drops `frame`.
        let result = match pending {
            Some(pending) => pending.complete(self.device.as_ref()),
            None => Err(RenderPathError::Submission(format!(
                "frame {frame_index} was already completed"
            ))),
        };
        drop(frame);
        let execution = result?;

        let postprocess = execution
            .report(StageId::PostOpaque)
            .and_then(|report| report.postprocess.clone());
        let debug_output = execution
            .reports
            .iter()
            .find_map(|(_, report)| report.debug_output);

        if execution.is_submitted() {
            self.last_postprocess.clone_from(&postprocess);
            self.debug_output = debug_output;
        }

        Ok(FrameReport {
            frame_index,
            outcome: execution.outcome,
            executed: execution.admitted,
            submission_order: execution.submitted,
            completion_order: execution.completion_order,
            postprocess,
            debug_output,
        })
    }

    #[inline]
    #[must_use]
    pub fn is_frame_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    // ========================================================================
    // Compositor outputs
    // ========================================================================

    /// Final limited-range image of the last submitted frame.
    #[must_use]
    pub fn last_postprocess_output(&self) -> Option<TextureHandle> {
        self.last_postprocess.as_ref().map(|summary| summary.output)
    }

    /// Blurred background of the last submitted frame, for UI compositing.
    #[must_use]
    pub fn blurred_background(&self) -> Option<TextureHandle> {
        self.last_postprocess
            .as_ref()
            .map(|summary| summary.blurred_background)
    }

    /// Debug visualisation written by the last submitted frame, if any.
    #[must_use]
    pub fn debug_output(&self) -> Option<TextureHandle> {
        self.debug_output
    }

    /// Handle of a provisioned target, resolved twin preferred.
    #[must_use]
    pub fn target(&self, id: TargetId) -> Option<TextureHandle> {
        let targets = &self.resources.as_ref()?.targets;
        targets.get(id).map(|_| targets.read(id))
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[must_use]
    pub fn settings(&self) -> &RenderPathSettings {
        &self.settings
    }

    /// Takes effect on the next frame. A changed `msaa_samples` applies on the
    /// next [`resize`](Self::resize).
    pub fn set_settings(&mut self, settings: RenderPathSettings) {
        if settings.msaa_samples != self.settings.msaa_samples {
            log::info!(
                "MSAA sample count {} takes effect on the next resize",
                settings.msaa_samples
            );
        }
        self.settings = Arc::new(settings);
    }

    /// Color-grading lookup used by the tonemap when grading is enabled.
    pub fn set_color_grading_lut(&mut self, lut: Option<TextureHandle>) {
        self.color_grading_lut = lut;
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replaces the main camera. Its aspect is kept in sync with the
    /// internal resolution.
    pub fn set_camera(&mut self, mut camera: Camera) {
        camera.aspect = self.resolution.width() as f32 / self.resolution.height() as f32;
        camera.update_projection_matrix();
        self.camera = camera;
    }

    /// Swaps in a custom body for one of the standard stages.
    pub fn replace_stage(&mut self, node: SharedStageNode) -> Option<SharedStageNode> {
        self.graph.replace(node)
    }

    #[must_use]
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }
}

impl Drop for RenderPath3D {
    fn drop(&mut self) {
        self.placeholders.release(self.device.as_ref());
    }
}

fn build_rotator(resources: &ProvisionedResources) -> BufferRotator {
    let targets = &resources.targets;
    BufferRotator::new(
        BufferSlot::new(
            targets.handle(TargetId::DepthHistory0),
            targets.handle(TargetId::DepthHistory1),
        ),
        FrameParityPair::new(
            targets.handle(TargetId::TemporalAa0),
            targets.handle(TargetId::TemporalAa1),
        ),
    )
}
