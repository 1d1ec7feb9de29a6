//! Per-frame recording context shared by every stage.
//!
//! Built by the coordinator once the update phase has closed and handed to
//! workers behind an `Arc`. Nothing in it is mutated while the frame records.

use std::sync::Arc;

use crate::device::{CapabilityFlags, DeviceCapabilities, PassKind, TextureHandle};
use crate::provisioner::ProvisionedResources;
use crate::resources::{PlaceholderTextures, RenderPassTable, RenderTargetSet};
use crate::rotation::BufferRotator;
use crate::scene::FrameState;
use crate::settings::{AoMode, RenderPathSettings};

pub struct StageContext {
    pub frame: Arc<FrameState>,
    pub settings: Arc<RenderPathSettings>,
    pub resources: Arc<ProvisionedResources>,
    pub placeholders: PlaceholderTextures,
    pub capabilities: DeviceCapabilities,
    pub rotator: BufferRotator,
    pub color_grading_lut: Option<TextureHandle>,
    /// Frames the device had submitted when this one began. Abandoned frames
    /// do not advance it.
    pub frame_counter: u64,
}

impl StageContext {
    #[inline]
    #[must_use]
    pub fn targets(&self) -> &RenderTargetSet {
        &self.resources.targets
    }

    #[inline]
    #[must_use]
    pub fn passes(&self) -> &RenderPassTable {
        &self.resources.passes
    }

    #[inline]
    #[must_use]
    pub fn supports(&self, flag: CapabilityFlags) -> bool {
        self.capabilities.supports(flag)
    }

    /// Planar reflections render this frame.
    #[must_use]
    pub fn planar_reflections_active(&self) -> bool {
        self.settings.reflections
            && self.frame.visibility.planar_reflection_visible()
            && self.frame.reflection_camera.is_some()
    }

    /// Light shafts render this frame (sun enabled and facing the camera).
    #[must_use]
    pub fn light_shafts_active(&self) -> bool {
        self.settings.light_shafts && self.frame.sun_faces_camera()
    }

    #[must_use]
    pub fn volumetric_lights_active(&self) -> bool {
        self.settings.volumetric_lights && self.frame.visibility.volumetric_lights_requested
    }

    /// The AO pass this frame runs, if any. Ray-traced AO without ray-tracing
    /// support runs nothing.
    #[must_use]
    pub fn ambient_occlusion_pass(&self) -> Option<PassKind> {
        match self.settings.ambient_occlusion.mode {
            AoMode::Disabled => None,
            AoMode::Ssao => Some(PassKind::Ssao),
            AoMode::Hbao => Some(PassKind::Hbao),
            AoMode::Msao => Some(PassKind::Msao),
            AoMode::Rtao => self
                .supports(CapabilityFlags::RAYTRACING)
                .then_some(PassKind::Rtao),
        }
    }

    /// Screen-space reflection pass this frame runs, if any.
    #[must_use]
    pub fn reflection_pass(&self) -> Option<PassKind> {
        if self.settings.raytraced_reflections && self.supports(CapabilityFlags::RAYTRACING) {
            Some(PassKind::RtReflections)
        } else if self.settings.ssr {
            Some(PassKind::Ssr)
        } else {
            None
        }
    }

    #[must_use]
    pub fn variable_rate_shading_active(&self) -> bool {
        self.settings.variable_rate_shading
            && self.supports(CapabilityFlags::VARIABLE_RATE_SHADING_TIER2)
            && self.targets().get(crate::resources::TargetId::ShadingRate).is_some()
    }
}
