//! Render Pass Descriptors
//!
//! Declares the attachments each stage's recording context renders into,
//! together with their load/store behavior and layout transitions. Built once
//! per resize alongside the [`RenderTargetSet`](super::RenderTargetSet).

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::device::{ResourceLayout, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    RenderTarget,
    DepthStencil,
    /// Single-sample resolve destination of the n-th render target.
    Resolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub texture: TextureHandle,
    pub load: LoadOp,
    pub store: StoreOp,
    pub initial_layout: ResourceLayout,
    pub subpass_layout: ResourceLayout,
    pub final_layout: ResourceLayout,
}

impl Attachment {
    #[must_use]
    pub fn render_target(texture: TextureHandle, load: LoadOp) -> Self {
        Self {
            kind: AttachmentKind::RenderTarget,
            texture,
            load,
            store: StoreOp::Store,
            initial_layout: ResourceLayout::ShaderResource,
            subpass_layout: ResourceLayout::RenderTarget,
            final_layout: ResourceLayout::ShaderResource,
        }
    }

    #[must_use]
    pub fn depth_stencil(
        texture: TextureHandle,
        load: LoadOp,
        store: StoreOp,
        initial_layout: ResourceLayout,
        subpass_layout: ResourceLayout,
        final_layout: ResourceLayout,
    ) -> Self {
        Self {
            kind: AttachmentKind::DepthStencil,
            texture,
            load,
            store,
            initial_layout,
            subpass_layout,
            final_layout,
        }
    }

    #[must_use]
    pub fn resolve(texture: TextureHandle) -> Self {
        Self {
            kind: AttachmentKind::Resolve,
            texture,
            load: LoadOp::DontCare,
            store: StoreOp::Store,
            initial_layout: ResourceLayout::ShaderResource,
            subpass_layout: ResourceLayout::RenderTarget,
            final_layout: ResourceLayout::ShaderResource,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: StoreOp) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_layouts(
        mut self,
        initial: ResourceLayout,
        subpass: ResourceLayout,
        final_layout: ResourceLayout,
    ) -> Self {
        self.initial_layout = initial;
        self.subpass_layout = subpass;
        self.final_layout = final_layout;
        self
    }
}

/// Render passes the render path begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPassId {
    DepthPrepass,
    Main,
    Transparent,
    OcclusionCulling,
    Reflection,
    DownsampleDepth,
    DownsampleScene,
    LightShafts,
    VolumetricLight,
    ParticleDistortion,
    WaterRipples,
}

impl RenderPassId {
    pub const ALL: [Self; 11] = [
        Self::DepthPrepass,
        Self::Main,
        Self::Transparent,
        Self::OcclusionCulling,
        Self::Reflection,
        Self::DownsampleDepth,
        Self::DownsampleScene,
        Self::LightShafts,
        Self::VolumetricLight,
        Self::ParticleDistortion,
        Self::WaterRipples,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DepthPrepass => "Depth Prepass",
            Self::Main => "Main",
            Self::Transparent => "Transparent",
            Self::OcclusionCulling => "Occlusion Culling",
            Self::Reflection => "Planar Reflection",
            Self::DownsampleDepth => "Downsample Depth",
            Self::DownsampleScene => "Downsample Scene",
            Self::LightShafts => "Light Shafts",
            Self::VolumetricLight => "Volumetric Light",
            Self::ParticleDistortion => "Particle Distortion",
            Self::WaterRipples => "Water Ripples",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    pub label: &'static str,
    pub attachments: SmallVec<[Attachment; 5]>,
}

impl RenderPassDesc {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            attachments: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns `true` when any attachment references `texture`.
    #[must_use]
    pub fn references(&self, texture: TextureHandle) -> bool {
        self.attachments.iter().any(|a| a.texture == texture)
    }

    /// The first render-target attachment, used to size viewports.
    #[must_use]
    pub fn first_render_target(&self) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.kind == AttachmentKind::RenderTarget)
    }

    #[must_use]
    pub fn resolves(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments
            .iter()
            .filter(|a| a.kind == AttachmentKind::Resolve)
    }
}

/// All render-pass descriptors of one provisioning generation.
#[derive(Debug, Clone, Default)]
pub struct RenderPassTable {
    passes: FxHashMap<RenderPassId, RenderPassDesc>,
}

impl RenderPassTable {
    pub(crate) fn insert(&mut self, id: RenderPassId, desc: RenderPassDesc) {
        self.passes.insert(id, desc);
    }

    /// # Panics
    ///
    /// Panics if the pass was not provisioned.
    #[must_use]
    pub fn get(&self, id: RenderPassId) -> &RenderPassDesc {
        self.passes
            .get(&id)
            .unwrap_or_else(|| panic!("render pass {} not provisioned", id.name()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RenderPassId, &RenderPassDesc)> {
        self.passes.iter()
    }
}
