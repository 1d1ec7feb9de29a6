//! Resource Provisioner
//!
//! Computes every resolution-dependent resource descriptor and allocates the
//! [`RenderTargetSet`] and [`RenderPassTable`] from them.
//!
//! Provisioning is all-or-nothing: each call releases everything the previous
//! call created and rebuilds from scratch. A creation failure releases the
//! partially built set and surfaces as [`RenderPathError::ResourceCreation`];
//! there is no degraded mode.
//!
//! # Target Extents
//!
//! | Target | Extent | Mips |
//! |--------|--------|------|
//! | G-buffer, SSR, AO, sun, TAA, postprocess, depth | `w × h` | 1 |
//! | Scene copy (+tmp) | `w/2 × h/2` | ≤ 8 |
//! | Bloom (+tmp), sun blur | `w/2 × h/2` | ≤ 5 (bloom) |
//! | Volumetric light (+tmp), reflection, small depth, GUI blur 0 | `w/4 × h/4` | 1 |
//! | GUI blur 1, 2 | `w/16 × h/16` | 1 |
//! | Linear depth | `w × h` | ≤ 6 |
//! | Shading rate (VRS tier 2) | `⌈w/tile⌉ × ⌈h/tile⌉` | 1 |

use std::sync::Arc;

use crate::device::{
    CapabilityFlags, DeviceCapabilities, GraphicsDevice, ResourceLayout, SubresourceKind,
    TextureHandle,
};
use crate::errors::{RenderPathError, Result};
use crate::resources::{
    Attachment, LoadOp, RenderPassDesc, RenderPassId, RenderPassTable, RenderTarget,
    RenderTargetSet, Resolution, ResourceDescriptor, StoreOp, TargetId, mip_level_count,
};

/// Mip cap of the scene-copy chain (SSR / refraction roughness levels).
pub const SCENE_COPY_MIP_CAP: u32 = 8;
/// Mip cap of the bloom chain.
pub const BLOOM_MIP_CAP: u32 = 5;
/// Mip cap of the linear-depth chain.
pub const LINEAR_DEPTH_MIP_CAP: u32 = 6;

const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SMALL_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth16Unorm;

/// Multisampled targets later read by stages that cannot consume MSAA input.
pub const MSAA_RESOLVED_TARGETS: [TargetId; 4] = [
    TargetId::GbufferColor,
    TargetId::GbufferNormalVelocity,
    TargetId::ParticleDistortion,
    TargetId::Sun,
];

fn resolved_label(id: TargetId) -> &'static str {
    match id {
        TargetId::GbufferColor => "gbuffer.color.resolved",
        TargetId::GbufferNormalVelocity => "gbuffer.normal.resolved",
        TargetId::ParticleDistortion => "particle.distortion.resolved",
        TargetId::Sun => "sun.resolved",
        other => other.name(),
    }
}

/// Format of one depth-history copy. A single-sample depth buffer is copied
/// verbatim; a multisampled one is resolved by a compute pass into a color
/// target.
#[must_use]
pub fn depth_history_format(sample_count: u32) -> wgpu::TextureFormat {
    if sample_count > 1 {
        wgpu::TextureFormat::R32Float
    } else {
        DEPTH_FORMAT
    }
}

/// Pure descriptor table for one resolution / sample count / capability set.
///
/// Resolve twins are not listed; they are derived from
/// [`MSAA_RESOLVED_TARGETS`] at allocation time.
#[must_use]
pub fn describe_targets(
    resolution: Resolution,
    sample_count: u32,
    capabilities: &DeviceCapabilities,
    display_format: wgpu::TextureFormat,
) -> Vec<(TargetId, ResourceDescriptor)> {
    use wgpu::TextureUsages as U;

    let full = (resolution.width(), resolution.height());
    let half = resolution.divided(2);
    let quarter = resolution.divided(4);
    let sixteenth = resolution.divided(16);
    let attach = U::RENDER_ATTACHMENT | U::TEXTURE_BINDING;
    let compute = U::TEXTURE_BINDING | U::STORAGE_BINDING;
    let both = attach | U::STORAGE_BINDING;

    let mut out = vec![
        (
            TargetId::GbufferColor,
            ResourceDescriptor::new("gbuffer.color", full, HDR_FORMAT, attach | U::COPY_SRC)
                .samples(sample_count),
        ),
        (
            TargetId::GbufferNormalVelocity,
            ResourceDescriptor::new("gbuffer.normal", full, HDR_FORMAT, attach).samples(sample_count),
        ),
        (
            TargetId::Ssr,
            ResourceDescriptor::new("ssr", full, HDR_FORMAT, compute),
        ),
        (
            TargetId::ParticleDistortion,
            ResourceDescriptor::new("particle.distortion", full, HDR_FORMAT, attach)
                .samples(sample_count),
        ),
        (
            TargetId::VolumetricLight,
            ResourceDescriptor::new("volumetric_light", quarter, HDR_FORMAT, both),
        ),
        (
            TargetId::VolumetricLightTmp,
            ResourceDescriptor::new("volumetric_light.tmp", quarter, HDR_FORMAT, both),
        ),
        (
            TargetId::WaterRipple,
            ResourceDescriptor::new("water_ripple", full, HDR_FORMAT, attach),
        ),
        (
            TargetId::SceneCopy,
            ResourceDescriptor::new("scene_copy", half, HDR_FORMAT, both)
                .mips(mip_level_count(half.0, half.1, SCENE_COPY_MIP_CAP)),
        ),
        (
            TargetId::SceneCopyTmp,
            ResourceDescriptor::new("scene_copy.tmp", half, HDR_FORMAT, both)
                .mips(mip_level_count(half.0, half.1, SCENE_COPY_MIP_CAP)),
        ),
        (
            TargetId::Reflection,
            ResourceDescriptor::new("reflection", quarter, HDR_FORMAT, attach),
        ),
        (
            TargetId::ReflectionDepth,
            ResourceDescriptor::new("reflection.depth", quarter, SMALL_DEPTH_FORMAT, attach)
                .layout(ResourceLayout::DepthStencil),
        ),
        (
            TargetId::AmbientOcclusion,
            ResourceDescriptor::new("ao", full, wgpu::TextureFormat::Rgba8Unorm, both),
        ),
        (
            TargetId::Sun,
            ResourceDescriptor::new("sun", full, HDR_FORMAT, attach).samples(sample_count),
        ),
        (
            TargetId::SunBlur,
            ResourceDescriptor::new("sun.blur", half, HDR_FORMAT, both),
        ),
        (
            TargetId::Bloom,
            ResourceDescriptor::new("bloom", half, HDR_FORMAT, both)
                .mips(mip_level_count(half.0, half.1, BLOOM_MIP_CAP)),
        ),
        (
            TargetId::BloomTmp,
            ResourceDescriptor::new("bloom.tmp", half, HDR_FORMAT, both)
                .mips(mip_level_count(half.0, half.1, BLOOM_MIP_CAP)),
        ),
        (
            TargetId::TemporalAa0,
            ResourceDescriptor::new("taa.0", full, HDR_FORMAT, both),
        ),
        (
            TargetId::TemporalAa1,
            ResourceDescriptor::new("taa.1", full, HDR_FORMAT, both),
        ),
        (
            TargetId::PostprocessHdr,
            ResourceDescriptor::new("postprocess.hdr", full, HDR_FORMAT, both),
        ),
        (
            TargetId::PostprocessLdr0,
            ResourceDescriptor::new("postprocess.ldr0", full, display_format, attach | U::COPY_SRC),
        ),
        (
            TargetId::PostprocessLdr1,
            ResourceDescriptor::new("postprocess.ldr1", full, display_format, attach | U::COPY_SRC),
        ),
        (
            TargetId::BlurredBackground0,
            ResourceDescriptor::new("gui_blur.0", quarter, display_format, attach),
        ),
        (
            TargetId::BlurredBackground1,
            ResourceDescriptor::new("gui_blur.1", sixteenth, display_format, attach),
        ),
        (
            TargetId::BlurredBackground2,
            ResourceDescriptor::new("gui_blur.2", sixteenth, display_format, attach),
        ),
        (
            TargetId::Depth,
            ResourceDescriptor::new("depth", full, DEPTH_FORMAT, attach | U::COPY_SRC)
                .samples(sample_count)
                .layout(ResourceLayout::DepthStencilReadOnly),
        ),
        (
            TargetId::SmallDepth,
            ResourceDescriptor::new("depth.small", quarter, SMALL_DEPTH_FORMAT, attach),
        ),
        (
            TargetId::LinearDepth,
            ResourceDescriptor::new("depth.linear", full, wgpu::TextureFormat::R32Float, compute)
                .mips(mip_level_count(full.0, full.1, LINEAR_DEPTH_MIP_CAP)),
        ),
        (
            TargetId::Luminance,
            ResourceDescriptor::new("luminance", (1, 1), wgpu::TextureFormat::R32Float, compute),
        ),
        (
            TargetId::DebugVisualization,
            ResourceDescriptor::new("debug.visualization", full, wgpu::TextureFormat::Rgba8Unorm, both),
        ),
    ];

    let history_format = depth_history_format(sample_count);
    let history_usage = if sample_count > 1 {
        compute
    } else {
        attach | U::COPY_DST
    };
    out.push((
        TargetId::DepthHistory0,
        ResourceDescriptor::new("depth.history0", full, history_format, history_usage),
    ));
    out.push((
        TargetId::DepthHistory1,
        ResourceDescriptor::new("depth.history1", full, history_format, history_usage),
    ));

    if capabilities.supports(CapabilityFlags::VARIABLE_RATE_SHADING_TIER2) {
        let tiles = resolution.tiles(capabilities.vrs_tile_size.max(1));
        out.push((
            TargetId::ShadingRate,
            ResourceDescriptor::new("shading_rate", tiles, wgpu::TextureFormat::R8Uint, compute)
                .layout(ResourceLayout::ShadingRateSource),
        ));
    }

    out
}

/// Render-pass descriptors over an allocated target set.
#[must_use]
pub fn describe_render_passes(targets: &RenderTargetSet) -> RenderPassTable {
    use ResourceLayout as L;

    let msaa = targets.needs_resolve();
    let depth = targets.handle(TargetId::Depth);
    let depth_read_only = Attachment::depth_stencil(
        depth,
        LoadOp::Load,
        StoreOp::Store,
        L::DepthStencilReadOnly,
        L::DepthStencilReadOnly,
        L::DepthStencilReadOnly,
    );
    let with_resolve = |desc: RenderPassDesc, id: TargetId| {
        if msaa {
            desc.with(Attachment::resolve(targets.read(id)))
        } else {
            desc
        }
    };

    let mut table = RenderPassTable::default();

    table.insert(
        RenderPassId::DepthPrepass,
        RenderPassDesc::new("Depth Prepass").with(Attachment::depth_stencil(
            depth,
            LoadOp::Clear,
            StoreOp::Store,
            L::DepthStencilReadOnly,
            L::DepthStencil,
            L::DepthStencilReadOnly,
        )),
    );

    let main = RenderPassDesc::new("Main")
        .with(Attachment::render_target(
            targets.handle(TargetId::GbufferColor),
            LoadOp::DontCare,
        ))
        .with(Attachment::render_target(
            targets.handle(TargetId::GbufferNormalVelocity),
            LoadOp::DontCare,
        ))
        .with(depth_read_only);
    let main = with_resolve(main, TargetId::GbufferColor);
    table.insert(
        RenderPassId::Main,
        with_resolve(main, TargetId::GbufferNormalVelocity),
    );

    let transparent = RenderPassDesc::new("Transparent")
        .with(Attachment::render_target(
            targets.handle(TargetId::GbufferColor),
            LoadOp::Load,
        ))
        .with(depth_read_only);
    table.insert(
        RenderPassId::Transparent,
        with_resolve(transparent, TargetId::GbufferColor),
    );

    table.insert(
        RenderPassId::OcclusionCulling,
        RenderPassDesc::new("Occlusion Culling")
            .with(depth_read_only.with_store(StoreOp::DontCare)),
    );

    table.insert(
        RenderPassId::Reflection,
        RenderPassDesc::new("Planar Reflection")
            .with(Attachment::render_target(
                targets.handle(TargetId::Reflection),
                LoadOp::Clear,
            ))
            .with(Attachment::depth_stencil(
                targets.handle(TargetId::ReflectionDepth),
                LoadOp::Clear,
                StoreOp::DontCare,
                L::DepthStencil,
                L::DepthStencil,
                L::DepthStencil,
            )),
    );

    table.insert(
        RenderPassId::DownsampleDepth,
        RenderPassDesc::new("Downsample Depth").with(Attachment::depth_stencil(
            targets.handle(TargetId::SmallDepth),
            LoadOp::DontCare,
            StoreOp::Store,
            L::ShaderResource,
            L::DepthStencil,
            L::ShaderResource,
        )),
    );

    table.insert(
        RenderPassId::DownsampleScene,
        RenderPassDesc::new("Downsample Scene").with(Attachment::render_target(
            targets.handle(TargetId::SceneCopy),
            LoadOp::DontCare,
        )),
    );

    let light_shafts = RenderPassDesc::new("Light Shafts")
        .with(Attachment::render_target(
            targets.handle(TargetId::Sun),
            LoadOp::Clear,
        ))
        .with(depth_read_only);
    table.insert(
        RenderPassId::LightShafts,
        with_resolve(light_shafts, TargetId::Sun),
    );

    table.insert(
        RenderPassId::VolumetricLight,
        RenderPassDesc::new("Volumetric Light").with(Attachment::render_target(
            targets.handle(TargetId::VolumetricLight),
            LoadOp::Clear,
        )),
    );

    let distortion = RenderPassDesc::new("Particle Distortion")
        .with(Attachment::render_target(
            targets.handle(TargetId::ParticleDistortion),
            LoadOp::Clear,
        ))
        .with(depth_read_only);
    table.insert(
        RenderPassId::ParticleDistortion,
        with_resolve(distortion, TargetId::ParticleDistortion),
    );

    table.insert(
        RenderPassId::WaterRipples,
        RenderPassDesc::new("Water Ripples").with(Attachment::render_target(
            targets.handle(TargetId::WaterRipple),
            LoadOp::Clear,
        )),
    );

    table
}

/// Result of one provisioning call.
#[derive(Debug, Clone)]
pub struct ProvisionedResources {
    pub targets: RenderTargetSet,
    pub passes: RenderPassTable,
}

/// Owns every resolution-dependent texture of the render path.
pub struct ResourceProvisioner {
    device: Arc<dyn GraphicsDevice>,
    owned: Vec<TextureHandle>,
}

impl ResourceProvisioner {
    #[must_use]
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            owned: Vec::new(),
        }
    }

    /// Textures created by the last successful [`provision`](Self::provision).
    #[must_use]
    pub fn owned(&self) -> &[TextureHandle] {
        &self.owned
    }

    /// Releases everything the previous call created, then allocates a fresh
    /// target set and render-pass table.
    pub fn provision(
        &mut self,
        resolution: Resolution,
        sample_count: u32,
        capabilities: &DeviceCapabilities,
    ) -> Result<ProvisionedResources> {
        if !sample_count.is_power_of_two() || !capabilities.supports_sample_count(sample_count) {
            return Err(RenderPathError::UnsupportedSampleCount(sample_count));
        }

        self.release();

        let mut created = Vec::new();
        match self.allocate(resolution, sample_count, capabilities, &mut created) {
            Ok(targets) => {
                let passes = describe_render_passes(&targets);
                log::info!(
                    "Provisioned {} render targets ({} textures, {} render passes) at {}x{} with {}x MSAA",
                    targets.len(),
                    created.len(),
                    passes.len(),
                    resolution.width(),
                    resolution.height(),
                    sample_count
                );
                self.owned = created;
                Ok(ProvisionedResources { targets, passes })
            }
            Err(err) => {
                log::error!("Resource provisioning failed: {err}");
                for texture in created {
                    self.device.release_texture(texture);
                }
                Err(err)
            }
        }
    }

    /// Releases every texture owned by the last provisioning call.
    pub fn release(&mut self) {
        for texture in self.owned.drain(..) {
            self.device.release_texture(texture);
        }
    }

    fn allocate(
        &self,
        resolution: Resolution,
        sample_count: u32,
        capabilities: &DeviceCapabilities,
        created: &mut Vec<TextureHandle>,
    ) -> Result<RenderTargetSet> {
        let mut set = RenderTargetSet::new(resolution, sample_count);
        let descriptors = describe_targets(
            resolution,
            sample_count,
            capabilities,
            self.device.display_format(),
        );

        for (id, desc) in descriptors {
            let texture = self.device.create_texture(&desc)?;
            created.push(texture);
            let mut target = RenderTarget::new(texture, desc);

            if target.desc.mip_chained {
                self.create_mip_views(&mut target)?;
            }

            if sample_count > 1 && MSAA_RESOLVED_TARGETS.contains(&id) {
                let mut twin = target.desc.clone().samples(1);
                twin.label = resolved_label(id);
                let resolved = self.device.create_texture(&twin)?;
                created.push(resolved);
                target.resolved = Some(resolved);
            }

            set.insert(id, target);
        }

        Ok(set)
    }

    /// Creates one sampled (and, for storage-capable targets, one storage) view
    /// per mip level.
    ///
    /// # Panics
    ///
    /// Panics when the device hands back a view index different from the
    /// requested mip level.
    fn create_mip_views(&self, target: &mut RenderTarget) -> Result<()> {
        let storage = target
            .desc
            .usage
            .contains(wgpu::TextureUsages::STORAGE_BINDING);

        for level in 0..target.desc.mip_level_count {
            let sampled = self
                .device
                .create_subresource(target.texture, SubresourceKind::Sampled, level)?;
            assert_eq!(
                sampled, level,
                "'{}': sampled view index diverged from mip level",
                target.desc.label
            );
            target.sampled_views.push(sampled);

            if storage {
                let unordered = self
                    .device
                    .create_subresource(target.texture, SubresourceKind::Storage, level)?;
                assert_eq!(
                    unordered, level,
                    "'{}': storage view index diverged from mip level",
                    target.desc.label
                );
                target.storage_views.push(unordered);
            }
        }
        Ok(())
    }
}

impl Drop for ResourceProvisioner {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    fn res(w: u32, h: u32) -> Resolution {
        Resolution::new(w, h).unwrap()
    }

    fn lookup(table: &[(TargetId, ResourceDescriptor)], id: TargetId) -> &ResourceDescriptor {
        &table.iter().find(|(t, _)| *t == id).unwrap().1
    }

    #[test]
    fn shading_rate_image_requires_vrs_tier2() {
        let caps = DeviceCapabilities::default();
        let table = describe_targets(res(100, 50), 1, &caps, wgpu::TextureFormat::Rgba8Unorm);
        assert!(table.iter().all(|(id, _)| *id != TargetId::ShadingRate));

        let caps = DeviceCapabilities {
            flags: CapabilityFlags::VARIABLE_RATE_SHADING_TIER2,
            ..DeviceCapabilities::default()
        };
        let table = describe_targets(res(100, 50), 1, &caps, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(lookup(&table, TargetId::ShadingRate).extent(), (7, 4));
    }

    #[test]
    fn depth_history_format_follows_sample_count() {
        let caps = DeviceCapabilities::default();
        let single = describe_targets(res(64, 64), 1, &caps, wgpu::TextureFormat::Rgba8Unorm);
        let multi = describe_targets(res(64, 64), 4, &caps, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(
            lookup(&single, TargetId::DepthHistory0).format,
            wgpu::TextureFormat::Depth32Float
        );
        assert_eq!(
            lookup(&multi, TargetId::DepthHistory1).format,
            wgpu::TextureFormat::R32Float
        );
    }

    #[test]
    fn unsupported_sample_count_is_rejected() {
        let device: Arc<dyn GraphicsDevice> = Arc::new(HeadlessDevice::default());
        let caps = device.capabilities().clone();
        let mut provisioner = ResourceProvisioner::new(device);
        assert!(matches!(
            provisioner.provision(res(64, 64), 8, &caps),
            Err(RenderPathError::UnsupportedSampleCount(8))
        ));
        assert!(matches!(
            provisioner.provision(res(64, 64), 3, &caps),
            Err(RenderPathError::UnsupportedSampleCount(3))
        ));
    }

    #[test]
    fn reprovision_releases_previous_generation() {
        let headless = Arc::new(HeadlessDevice::default());
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let caps = device.capabilities().clone();
        let mut provisioner = ResourceProvisioner::new(device);

        let first = provisioner.provision(res(320, 200), 1, &caps).unwrap();
        let live = headless.live_texture_count();
        let old_gbuffer = first.targets.handle(TargetId::GbufferColor);

        let second = provisioner.provision(res(640, 400), 1, &caps).unwrap();
        assert_eq!(headless.live_texture_count(), live);
        assert!(!headless.is_live(old_gbuffer));
        assert_eq!(
            second.targets.target(TargetId::GbufferColor).desc.extent(),
            (640, 400)
        );
    }

    #[test]
    fn creation_failure_leaves_nothing_behind() {
        let headless = Arc::new(HeadlessDevice::default());
        headless.fail_texture("bloom.tmp");
        let device: Arc<dyn GraphicsDevice> = headless.clone();
        let caps = device.capabilities().clone();
        let mut provisioner = ResourceProvisioner::new(device);

        let err = provisioner.provision(res(320, 200), 1, &caps).unwrap_err();
        assert!(matches!(
            err,
            RenderPathError::ResourceCreation {
                label: "bloom.tmp",
                ..
            }
        ));
        assert_eq!(headless.live_texture_count(), 0);
        assert!(provisioner.owned().is_empty());
    }

    #[test]
    #[should_panic(expected = "view index diverged")]
    fn skewed_view_index_is_fatal() {
        let headless = Arc::new(HeadlessDevice::default());
        headless.skew_view_indices(1);
        let device: Arc<dyn GraphicsDevice> = headless;
        let caps = device.capabilities().clone();
        let mut provisioner = ResourceProvisioner::new(device);
        let _ = provisioner.provision(res(320, 200), 1, &caps);
    }
}
