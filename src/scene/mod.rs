//! Scene Collaborator Interface
//!
//! The render path never walks a scene graph. It consumes:
//! - [`SceneProvider::update`] once per update tick,
//! - per-viewpoint [`VisibilityResult`]s (main camera, reflection camera),
//! - the sun direction, used to gate light shafts.
//!
//! Everything a frame's stages read is frozen into an immutable [`FrameState`]
//! when the update phase closes.

pub mod camera;

use bitflags::bitflags;
use glam::{Vec2, Vec3, Vec4};

pub use camera::Camera;

/// Opaque identifier of a visible scene object.
pub type ObjectId = u32;

bitflags! {
    /// What a visibility query should gather.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VisibilityFlags: u32 {
        const OBJECTS = 1 << 0;
        const LIGHTS = 1 << 1;
        const DECALS = 1 << 2;
        const EMITTERS = 1 << 3;
        /// Detect planar reflectors (water, mirrors).
        const REQUEST_REFLECTION = 1 << 4;
        const OCCLUSION_CULLING = 1 << 5;
        const EVERYTHING = Self::OBJECTS.bits()
            | Self::LIGHTS.bits()
            | Self::DECALS.bits()
            | Self::EMITTERS.bits()
            | Self::REQUEST_REFLECTION.bits()
            | Self::OCCLUSION_CULLING.bits();
    }
}

/// Precomputed visible set of one viewpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityResult {
    pub objects: Vec<ObjectId>,
    /// Detected reflection plane (`xyz` normal, `w` offset), if any reflector
    /// is visible.
    pub reflection_plane: Option<Vec4>,
    /// At least one visible light requests volumetric scattering.
    pub volumetric_lights_requested: bool,
    /// Visible water surfaces produce ripples.
    pub water_ripples: bool,
}

impl VisibilityResult {
    #[inline]
    #[must_use]
    pub fn planar_reflection_visible(&self) -> bool {
        self.reflection_plane.is_some()
    }
}

/// The scene / visibility collaborator.
pub trait SceneProvider: Send {
    /// Advances simulation by `dt` seconds.
    fn update(&mut self, dt: f32);

    fn visibility(
        &self,
        camera: &Camera,
        layer_mask: u32,
        flags: VisibilityFlags,
    ) -> VisibilityResult;

    /// Direction towards the sun, if the scene has one.
    fn sun_direction(&self) -> Option<Vec3>;
}

/// Immutable per-frame snapshot shared by every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    pub frame_index: u64,
    pub delta_time: f32,
    pub camera: Camera,
    /// The main camera as it was during the previous frame.
    pub previous_camera: Camera,
    /// Main camera mirrored across the detected reflection plane.
    pub reflection_camera: Option<Camera>,
    pub visibility: VisibilityResult,
    pub reflection_visibility: Option<VisibilityResult>,
    pub sun_direction: Option<Vec3>,
}

impl FrameState {
    /// Whether the sun direction faces the camera
    /// (`dot(sun, forward) > 0`).
    #[must_use]
    pub fn sun_faces_camera(&self) -> bool {
        self.sun_direction
            .is_some_and(|sun| sun.dot(self.camera.forward()) > 0.0)
    }
}

/// Radical inverse of `index` in `base`.
#[must_use]
pub fn halton(mut index: u32, base: u32) -> f32 {
    let mut fraction = 1.0;
    let mut result = 0.0;
    while index > 0 {
        fraction /= base as f32;
        result += fraction * (index % base) as f32;
        index /= base;
    }
    result
}

/// Clip-space sub-pixel jitter of `frame` for a `width × height` target.
///
/// Halton(2, 3) indexed by `frame mod 256`, mapped to `[-1, 1)` pixels.
#[must_use]
pub fn temporal_jitter(frame: u64, width: u32, height: u32) -> Vec2 {
    let index = (frame % 256) as u32;
    Vec2::new(
        (halton(index, 2) * 2.0 - 1.0) / width as f32,
        (halton(index, 3) * 2.0 - 1.0) / height as f32,
    )
}
