//! Backend-Neutral Command Lists
//!
//! A [`CommandList`] is the recording context a stage body writes into. It is
//! opened by the coordinating thread (which fixes its submission position via
//! [`CommandList::sequence`]) and then moved to a worker for recording.
//!
//! # Barrier Tracking
//!
//! Every explicit [`Barrier`] is checked against the layout the list last left
//! the resource in. The first transition of a resource records its *resting*
//! layout; [`CommandList::finish`] asserts that every transitioned resource
//! was returned to it. A consumer therefore never leaves a shared resource
//! half-transitioned for the stages recorded after it.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::TextureHandle;
use crate::resources::RenderPassDesc;

/// Image layout / resource state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceLayout {
    ShaderResource,
    RenderTarget,
    DepthStencil,
    DepthStencilReadOnly,
    /// Read-write access from compute.
    General,
    CopySrc,
    CopyDst,
    ShadingRateSource,
}

/// A single layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    pub texture: TextureHandle,
    pub before: ResourceLayout,
    pub after: ResourceLayout,
}

impl Barrier {
    #[inline]
    #[must_use]
    pub const fn image(texture: TextureHandle, before: ResourceLayout, after: ResourceLayout) -> Self {
        Self {
            texture,
            before,
            after,
        }
    }
}

/// Named texture slots bound for the draws of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindSlot {
    Depth,
    LinearDepth,
    Reflection,
    AmbientOcclusion,
    ScreenSpaceReflection,
    Refraction,
    WaterRipples,
}

/// Opaque shader work. The render path only schedules these; their numeric
/// algorithms belong to the shader library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    // Setup
    UpdateRenderData,
    UpdateAccelerationStructures,
    OcclusionCulling,
    // Shadows / GI
    ShadowMaps,
    VoxelRadiance,
    // Common resources
    RefreshDecalAtlas,
    RefreshLightmapAtlas,
    RefreshEnvProbes,
    RefreshImpostors,
    // Scene drawing
    UpdateCameraBuffer,
    DrawSceneDepth,
    DrawSceneOpaque,
    DrawSceneReflection,
    DrawSceneTransparent,
    DrawSky,
    DrawSun,
    DrawWaterRipples,
    DrawLightVisualizers,
    DrawSoftParticles,
    DrawDistortionParticles,
    DrawLensFlares,
    // Depth
    ResolveMsaaDepth,
    LinearDepth,
    DownsampleDepth,
    // Ambient occlusion
    Ssao,
    Hbao,
    Msao,
    Rtao,
    // Lighting
    TiledLightCulling,
    ShadingRateClassification,
    Outline,
    LightShafts,
    VolumetricLights,
    BilateralBlur,
    BilateralUpsample,
    AdditiveBlit,
    // Scene color
    DownsampleScene,
    GenerateMipChain,
    Ssr,
    RtReflections,
    // Postprocess chain
    VolumetricClouds,
    TemporalAa,
    DepthOfField,
    MotionBlur,
    Bloom,
    ComputeLuminance,
    Tonemap,
    Sharpen,
    Fxaa,
    ChromaticAberration,
    Downsample4x,
    GaussianBlur,
}

impl PassKind {
    /// Debug label used for GPU markers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpdateRenderData => "Update Render Data",
            Self::UpdateAccelerationStructures => "Update Acceleration Structures",
            Self::OcclusionCulling => "Occlusion Culling",
            Self::ShadowMaps => "Shadow Maps",
            Self::VoxelRadiance => "Voxel Radiance",
            Self::RefreshDecalAtlas => "Refresh Decal Atlas",
            Self::RefreshLightmapAtlas => "Refresh Lightmap Atlas",
            Self::RefreshEnvProbes => "Refresh Env Probes",
            Self::RefreshImpostors => "Refresh Impostors",
            Self::UpdateCameraBuffer => "Update Camera Buffer",
            Self::DrawSceneDepth => "Draw Scene Depth",
            Self::DrawSceneOpaque => "Draw Scene Opaque",
            Self::DrawSceneReflection => "Draw Scene Reflection",
            Self::DrawSceneTransparent => "Draw Scene Transparent",
            Self::DrawSky => "Draw Sky",
            Self::DrawSun => "Draw Sun",
            Self::DrawWaterRipples => "Draw Water Ripples",
            Self::DrawLightVisualizers => "Draw Light Visualizers",
            Self::DrawSoftParticles => "Draw Soft Particles",
            Self::DrawDistortionParticles => "Draw Distortion Particles",
            Self::DrawLensFlares => "Draw Lens Flares",
            Self::ResolveMsaaDepth => "Resolve MSAA Depth",
            Self::LinearDepth => "Linear Depth",
            Self::DownsampleDepth => "Downsample Depth",
            Self::Ssao => "SSAO",
            Self::Hbao => "HBAO",
            Self::Msao => "MSAO",
            Self::Rtao => "RTAO",
            Self::TiledLightCulling => "Tiled Light Culling",
            Self::ShadingRateClassification => "Shading Rate Classification",
            Self::Outline => "Outline",
            Self::LightShafts => "Light Shafts",
            Self::VolumetricLights => "Volumetric Lights",
            Self::BilateralBlur => "Bilateral Blur",
            Self::BilateralUpsample => "Bilateral Upsample",
            Self::AdditiveBlit => "Additive Blit",
            Self::DownsampleScene => "Downsample Scene",
            Self::GenerateMipChain => "Generate Mip Chain",
            Self::Ssr => "SSR",
            Self::RtReflections => "RT Reflections",
            Self::VolumetricClouds => "Volumetric Clouds",
            Self::TemporalAa => "Temporal AA",
            Self::DepthOfField => "Depth Of Field",
            Self::MotionBlur => "Motion Blur",
            Self::Bloom => "Bloom",
            Self::ComputeLuminance => "Compute Luminance",
            Self::Tonemap => "Tonemap",
            Self::Sharpen => "Sharpen",
            Self::Fxaa => "FXAA",
            Self::ChromaticAberration => "Chromatic Aberration",
            Self::Downsample4x => "Downsample 4x",
            Self::GaussianBlur => "Gaussian Blur",
        }
    }
}

/// One invocation of an opaque pass body.
#[derive(Debug, Clone, PartialEq)]
pub struct PassInvocation {
    pub kind: PassKind,
    /// Read handles, in the pass's argument order.
    pub inputs: SmallVec<[TextureHandle; 6]>,
    /// Written handles, in the pass's argument order.
    pub outputs: SmallVec<[TextureHandle; 2]>,
    pub params: SmallVec<[f32; 4]>,
}

impl PassInvocation {
    #[must_use]
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            params: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn input(mut self, texture: TextureHandle) -> Self {
        self.inputs.push(texture);
        self
    }

    #[must_use]
    pub fn output(mut self, texture: TextureHandle) -> Self {
        self.outputs.push(texture);
        self
    }

    #[must_use]
    pub fn param(mut self, value: f32) -> Self {
        self.params.push(value);
        self
    }

    #[must_use]
    pub fn params(mut self, values: &[f32]) -> Self {
        self.params.extend_from_slice(values);
        self
    }
}

/// A recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PushDebugGroup(&'static str),
    PopDebugGroup,
    BeginRenderPass(RenderPassDesc),
    EndRenderPass,
    Barrier(SmallVec<[Barrier; 4]>),
    /// Whole-resource copy.
    Copy {
        src: TextureHandle,
        dst: TextureHandle,
    },
    /// `None` unbinds the slot.
    BindTexture {
        slot: BindSlot,
        texture: Option<TextureHandle>,
    },
    BindShadingRateImage(Option<TextureHandle>),
    Pass(PassInvocation),
}

/// Recording context for one stage.
#[derive(Debug, Clone)]
pub struct CommandList {
    sequence: u64,
    label: &'static str,
    commands: Vec<Command>,
    /// `texture -> (resting, current)` for every texture this list transitioned.
    layouts: FxHashMap<TextureHandle, (ResourceLayout, ResourceLayout)>,
    render_pass_open: bool,
    debug_depth: u32,
}

impl CommandList {
    /// Backends call this from [`GraphicsDevice::begin_command_list`].
    ///
    /// [`GraphicsDevice::begin_command_list`]: super::GraphicsDevice::begin_command_list
    #[must_use]
    pub fn new(sequence: u64, label: &'static str) -> Self {
        Self {
            sequence,
            label,
            commands: Vec::with_capacity(32),
            layouts: FxHashMap::default(),
            render_pass_open: false,
            debug_depth: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Iterates the pass invocations recorded so far.
    pub fn passes(&self) -> impl Iterator<Item = &PassInvocation> {
        self.commands.iter().filter_map(|c| match c {
            Command::Pass(p) => Some(p),
            _ => None,
        })
    }

    pub fn push_debug_group(&mut self, label: &'static str) {
        self.debug_depth += 1;
        self.commands.push(Command::PushDebugGroup(label));
    }

    pub fn pop_debug_group(&mut self) {
        assert!(self.debug_depth > 0, "pop_debug_group without matching push");
        self.debug_depth -= 1;
        self.commands.push(Command::PopDebugGroup);
    }

    pub fn begin_render_pass(&mut self, desc: &RenderPassDesc) {
        assert!(
            !self.render_pass_open,
            "render pass '{}' begun inside another render pass",
            desc.label
        );
        self.render_pass_open = true;
        self.commands.push(Command::BeginRenderPass(desc.clone()));
    }

    pub fn end_render_pass(&mut self) {
        assert!(self.render_pass_open, "end_render_pass without begin");
        self.render_pass_open = false;
        self.commands.push(Command::EndRenderPass);
    }

    /// Records a batch of layout transitions.
    ///
    /// # Panics
    ///
    /// Panics if a barrier's `before` layout disagrees with the layout this
    /// list last transitioned the resource to.
    pub fn barrier(&mut self, barriers: &[Barrier]) {
        for b in barriers {
            let entry = self.layouts.entry(b.texture).or_insert((b.before, b.before));
            assert_eq!(
                entry.1, b.before,
                "resource {:?} expected in {:?} but tracked in {:?}",
                b.texture, b.before, entry.1
            );
            entry.1 = b.after;
        }
        self.commands.push(Command::Barrier(SmallVec::from_slice(barriers)));
    }

    pub fn copy(&mut self, src: TextureHandle, dst: TextureHandle) {
        self.commands.push(Command::Copy { src, dst });
    }

    pub fn bind_texture(&mut self, slot: BindSlot, texture: TextureHandle) {
        self.commands.push(Command::BindTexture {
            slot,
            texture: Some(texture),
        });
    }

    pub fn unbind_texture(&mut self, slot: BindSlot) {
        self.commands.push(Command::BindTexture {
            slot,
            texture: None,
        });
    }

    pub fn bind_shading_rate_image(&mut self, texture: Option<TextureHandle>) {
        self.commands.push(Command::BindShadingRateImage(texture));
    }

    pub fn dispatch(&mut self, pass: PassInvocation) {
        self.commands.push(Command::Pass(pass));
    }

    /// Closes the list for submission.
    ///
    /// # Panics
    ///
    /// Panics on an open render pass, unbalanced debug groups, or a resource
    /// left outside its resting layout.
    #[must_use]
    pub fn finish(self) -> Self {
        assert!(
            !self.render_pass_open,
            "command list '{}' finished with an open render pass",
            self.label
        );
        assert_eq!(
            self.debug_depth, 0,
            "command list '{}' finished with unbalanced debug groups",
            self.label
        );
        for (texture, (resting, current)) in &self.layouts {
            assert_eq!(
                resting, current,
                "command list '{}' left {:?} in {:?} (resting layout {:?})",
                self.label, texture, current, resting
            );
        }
        self
    }
}
