//! Frame Stage Definitions
//!
//! `StageId` defines the fixed stage order of a 3D frame. Recording contexts
//! are opened in this order, which is also the GPU submission order.

/// Frame stage enumeration.
///
/// # Stage Overview
///
/// | Stage | Admission | Typical Content |
/// |-------|-----------|-----------------|
/// | `Setup` | always | render data upload, acceleration structures, occlusion queries |
/// | `ShadowMaps` | shadows on, not replaced by RT shadows | shadow atlas |
/// | `GlobalIllumination` | voxel GI on | voxel radiance |
/// | `CommonResourceRefresh` | always | decal / lightmap atlases, env probes, impostors |
/// | `PlanarReflections` | visible reflection plane | mirrored scene |
/// | `DepthPrepassAndLinearization` | always | depth prepass, depth history, linear depth, AO |
/// | `LightCullingAndOpaque` | always | tiled culling, VRS classification, opaque, sky, outline |
/// | `PostOpaque` | always | light shafts, volumetrics, SSR, transparent, postprocess chain |
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[repr(u8)]
pub enum StageId {
    /// Occlusion queries against the previous frame's camera and depth.
    Setup = 0,

    /// Shadow map rendering.
    ShadowMaps = 1,

    /// Voxel radiance global illumination.
    GlobalIllumination = 2,

    /// Refresh of shared atlases and probes.
    CommonResourceRefresh = 3,

    /// Scene rendered from the reflected camera.
    PlanarReflections = 4,

    /// Depth-only pass and everything derived from depth.
    DepthPrepassAndLinearization = 5,

    /// Light culling and the opaque geometry pass.
    LightCullingAndOpaque = 6,

    /// Everything after opaque geometry, postprocess included.
    PostOpaque = 7,
}

impl StageId {
    /// All stages in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Setup,
        Self::ShadowMaps,
        Self::GlobalIllumination,
        Self::CommonResourceRefresh,
        Self::PlanarReflections,
        Self::DepthPrepassAndLinearization,
        Self::LightCullingAndOpaque,
        Self::PostOpaque,
    ];

    /// Position in the frame. Stage failures are reported in this order.
    #[inline]
    #[must_use]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Stage name (for debugging and command-list labels).
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Setup => "Setup",
            Self::ShadowMaps => "ShadowMaps",
            Self::GlobalIllumination => "GlobalIllumination",
            Self::CommonResourceRefresh => "CommonResourceRefresh",
            Self::PlanarReflections => "PlanarReflections",
            Self::DepthPrepassAndLinearization => "DepthPrepassAndLinearization",
            Self::LightCullingAndOpaque => "LightCullingAndOpaque",
            Self::PostOpaque => "PostOpaque",
        }
    }
}
