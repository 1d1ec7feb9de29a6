//! Render Target Set
//!
//! Owned resource table keyed by stage-scoped target identifiers. The table is
//! recreated wholesale by the provisioner on resize and never patched in place,
//! so no recording context can observe a half-updated set.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::device::TextureHandle;
use crate::resources::{ResourceDescriptor, Resolution};

/// Stage-scoped render target identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    GbufferColor,
    GbufferNormalVelocity,
    Ssr,
    ParticleDistortion,
    VolumetricLight,
    VolumetricLightTmp,
    WaterRipple,
    SceneCopy,
    SceneCopyTmp,
    Reflection,
    ReflectionDepth,
    AmbientOcclusion,
    Sun,
    SunBlur,
    Bloom,
    BloomTmp,
    TemporalAa0,
    TemporalAa1,
    PostprocessHdr,
    PostprocessLdr0,
    PostprocessLdr1,
    BlurredBackground0,
    BlurredBackground1,
    BlurredBackground2,
    ShadingRate,
    Depth,
    DepthHistory0,
    DepthHistory1,
    SmallDepth,
    LinearDepth,
    Luminance,
    DebugVisualization,
}

impl TargetId {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GbufferColor => "gbuffer.color",
            Self::GbufferNormalVelocity => "gbuffer.normal",
            Self::Ssr => "ssr",
            Self::ParticleDistortion => "particle.distortion",
            Self::VolumetricLight => "volumetric_light",
            Self::VolumetricLightTmp => "volumetric_light.tmp",
            Self::WaterRipple => "water_ripple",
            Self::SceneCopy => "scene_copy",
            Self::SceneCopyTmp => "scene_copy.tmp",
            Self::Reflection => "reflection",
            Self::ReflectionDepth => "reflection.depth",
            Self::AmbientOcclusion => "ao",
            Self::Sun => "sun",
            Self::SunBlur => "sun.blur",
            Self::Bloom => "bloom",
            Self::BloomTmp => "bloom.tmp",
            Self::TemporalAa0 => "taa.0",
            Self::TemporalAa1 => "taa.1",
            Self::PostprocessHdr => "postprocess.hdr",
            Self::PostprocessLdr0 => "postprocess.ldr0",
            Self::PostprocessLdr1 => "postprocess.ldr1",
            Self::BlurredBackground0 => "gui_blur.0",
            Self::BlurredBackground1 => "gui_blur.1",
            Self::BlurredBackground2 => "gui_blur.2",
            Self::ShadingRate => "shading_rate",
            Self::Depth => "depth",
            Self::DepthHistory0 => "depth.history0",
            Self::DepthHistory1 => "depth.history1",
            Self::SmallDepth => "depth.small",
            Self::LinearDepth => "depth.linear",
            Self::Luminance => "luminance",
            Self::DebugVisualization => "debug.visualization",
        }
    }
}

/// A live target: primary resource, optional single-sample resolve twin and
/// per-mip view indices.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub texture: TextureHandle,
    /// Present only when the primary resource is multisampled.
    pub resolved: Option<TextureHandle>,
    pub desc: ResourceDescriptor,
    pub sampled_views: SmallVec<[u32; 8]>,
    pub storage_views: SmallVec<[u32; 8]>,
}

impl RenderTarget {
    #[must_use]
    pub fn new(texture: TextureHandle, desc: ResourceDescriptor) -> Self {
        Self {
            texture,
            resolved: None,
            desc,
            sampled_views: SmallVec::new(),
            storage_views: SmallVec::new(),
        }
    }

    /// Handle non-MSAA-aware consumers read: the resolve twin when one
    /// exists, the primary resource otherwise.
    #[inline]
    #[must_use]
    pub fn read_handle(&self) -> TextureHandle {
        self.resolved.unwrap_or(self.texture)
    }
}

/// Resolution-dependent targets of one provisioning generation.
#[derive(Debug, Clone)]
pub struct RenderTargetSet {
    resolution: Resolution,
    sample_count: u32,
    targets: FxHashMap<TargetId, RenderTarget>,
}

impl RenderTargetSet {
    #[must_use]
    pub(crate) fn new(resolution: Resolution, sample_count: u32) -> Self {
        Self {
            resolution,
            sample_count,
            targets: FxHashMap::default(),
        }
    }

    pub(crate) fn insert(&mut self, id: TargetId, target: RenderTarget) {
        let previous = self.targets.insert(id, target);
        debug_assert!(previous.is_none(), "target {} provisioned twice", id.name());
    }

    pub(crate) fn get_mut(&mut self, id: TargetId) -> Option<&mut RenderTarget> {
        self.targets.get_mut(&id)
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Whether multisampled targets carry a resolve twin.
    #[inline]
    #[must_use]
    pub fn needs_resolve(&self) -> bool {
        self.sample_count > 1
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: TargetId) -> Option<&RenderTarget> {
        self.targets.get(&id)
    }

    /// # Panics
    ///
    /// Panics if `id` was not provisioned. Optional targets (the shading-rate
    /// image) must be queried through [`get`](Self::get).
    #[must_use]
    pub fn target(&self, id: TargetId) -> &RenderTarget {
        self.targets
            .get(&id)
            .unwrap_or_else(|| panic!("render target {} not provisioned", id.name()))
    }

    /// Primary handle of a target.
    #[inline]
    #[must_use]
    pub fn handle(&self, id: TargetId) -> TextureHandle {
        self.target(id).texture
    }

    /// Resolve-aware read handle of a target.
    #[inline]
    #[must_use]
    pub fn read(&self, id: TargetId) -> TextureHandle {
        self.target(id).read_handle()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TargetId, &RenderTarget)> {
        self.targets.iter()
    }

    /// Every texture owned by this set, resolve twins included.
    pub fn textures(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.targets
            .values()
            .flat_map(|t| std::iter::once(t.texture).chain(t.resolved))
    }
}
