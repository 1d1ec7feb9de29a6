//! Resource Provisioning Tests
//!
//! Tests for:
//! - Target extents as exact integer divisors of the internal resolution
//! - Mip-chain level counts and per-level view indices
//! - MSAA resolve twins (present iff sample count > 1)
//! - Depth history filled by a resolve pass under MSAA, by a copy otherwise

use std::sync::Arc;

use myth_renderpath::device::{Command, PassKind};
use myth_renderpath::provisioner::{
    BLOOM_MIP_CAP, LINEAR_DEPTH_MIP_CAP, MSAA_RESOLVED_TARGETS, SCENE_COPY_MIP_CAP,
    describe_targets,
};
use myth_renderpath::resources::{RenderPassId, mip_level_count};
use myth_renderpath::{
    DeviceCapabilities, GraphicsDevice, HeadlessDevice, RenderPath3D, RenderPathSettings,
    Resolution, ResourceProvisioner, SceneProvider, StageId, TargetId, VisibilityFlags,
    VisibilityResult, WorkerPool,
};

const RESOLUTIONS: [(u32, u32); 5] = [(1920, 1080), (1280, 720), (333, 197), (17, 9), (1, 1)];

fn provision(
    device: &Arc<HeadlessDevice>,
    width: u32,
    height: u32,
    samples: u32,
) -> (ResourceProvisioner, myth_renderpath::ProvisionedResources) {
    let dyn_device: Arc<dyn GraphicsDevice> = device.clone();
    let mut provisioner = ResourceProvisioner::new(dyn_device);
    let resources = provisioner
        .provision(
            Resolution::new(width, height).unwrap(),
            samples,
            device.capabilities(),
        )
        .unwrap();
    (provisioner, resources)
}

fn divisor_of(id: TargetId) -> Option<u32> {
    match id {
        TargetId::GbufferColor
        | TargetId::GbufferNormalVelocity
        | TargetId::Ssr
        | TargetId::ParticleDistortion
        | TargetId::WaterRipple
        | TargetId::AmbientOcclusion
        | TargetId::Sun
        | TargetId::TemporalAa0
        | TargetId::TemporalAa1
        | TargetId::PostprocessHdr
        | TargetId::PostprocessLdr0
        | TargetId::PostprocessLdr1
        | TargetId::Depth
        | TargetId::DepthHistory0
        | TargetId::DepthHistory1
        | TargetId::LinearDepth
        | TargetId::DebugVisualization => Some(1),
        TargetId::SceneCopy
        | TargetId::SceneCopyTmp
        | TargetId::SunBlur
        | TargetId::Bloom
        | TargetId::BloomTmp => Some(2),
        TargetId::VolumetricLight
        | TargetId::VolumetricLightTmp
        | TargetId::Reflection
        | TargetId::ReflectionDepth
        | TargetId::SmallDepth
        | TargetId::BlurredBackground0 => Some(4),
        TargetId::BlurredBackground1 | TargetId::BlurredBackground2 => Some(16),
        // Fixed-size or tile-rounded.
        TargetId::Luminance | TargetId::ShadingRate => None,
    }
}

// ============================================================================
// Extents
// ============================================================================

#[test]
fn extents_are_exact_divisors() {
    let caps = DeviceCapabilities::default();
    for (w, h) in RESOLUTIONS {
        let resolution = Resolution::new(w, h).unwrap();
        for (id, desc) in describe_targets(resolution, 1, &caps, wgpu::TextureFormat::Rgba8Unorm) {
            let Some(d) = divisor_of(id) else { continue };
            assert_eq!(
                (desc.width, desc.height),
                ((w / d).max(1), (h / d).max(1)),
                "{} at {w}x{h}",
                id.name()
            );
        }
    }
}

#[test]
fn reference_extents_at_1080p() {
    let device = Arc::new(HeadlessDevice::default());
    let (_provisioner, resources) = provision(&device, 1920, 1080, 1);
    let extent = |id| {
        let desc = &resources.targets.target(id).desc;
        (desc.width, desc.height)
    };

    assert_eq!(extent(TargetId::GbufferColor), (1920, 1080));
    assert_eq!(extent(TargetId::VolumetricLight), (480, 270));
    assert_eq!(extent(TargetId::Bloom), (960, 540));
    assert_eq!(extent(TargetId::BlurredBackground2), (120, 67));
    assert_eq!(extent(TargetId::Luminance), (1, 1));
    assert!(resources.targets.get(TargetId::ShadingRate).is_none());
}

#[test]
fn shading_rate_image_is_tile_rounded() {
    let device = Arc::new(HeadlessDevice::full_featured());
    let (_provisioner, resources) = provision(&device, 1920, 1080, 1);
    let tile = device.capabilities().vrs_tile_size;
    let desc = &resources.targets.target(TargetId::ShadingRate).desc;
    assert_eq!(
        (desc.width, desc.height),
        (1920_u32.div_ceil(tile), 1080_u32.div_ceil(tile))
    );
}

// ============================================================================
// Mip chains
// ============================================================================

#[test]
fn mip_chains_follow_the_capped_log2_rule() {
    let device = Arc::new(HeadlessDevice::default());
    for (w, h) in RESOLUTIONS {
        let (_provisioner, resources) = provision(&device, w, h, 1);
        let half = ((w / 2).max(1), (h / 2).max(1));

        for (id, cap, extent) in [
            (TargetId::SceneCopy, SCENE_COPY_MIP_CAP, half),
            (TargetId::SceneCopyTmp, SCENE_COPY_MIP_CAP, half),
            (TargetId::Bloom, BLOOM_MIP_CAP, half),
            (TargetId::BloomTmp, BLOOM_MIP_CAP, half),
            (TargetId::LinearDepth, LINEAR_DEPTH_MIP_CAP, (w, h)),
        ] {
            let target = resources.targets.target(id);
            let largest = extent.0.max(extent.1);
            let expected = cap.min(largest.ilog2() + 1);
            assert_eq!(target.desc.mip_level_count, expected, "{} at {w}x{h}", id.name());
            assert_eq!(mip_level_count(extent.0, extent.1, cap), expected);

            let levels: Vec<u32> = (0..expected).collect();
            assert_eq!(target.sampled_views.as_slice(), levels.as_slice());
            assert_eq!(target.storage_views.as_slice(), levels.as_slice());

            let recorded = device.texture(target.texture).unwrap();
            assert_eq!(recorded.sampled_views, levels);
        }
    }
}

#[test]
fn single_level_chains_still_get_a_level_zero_view() {
    let device = Arc::new(HeadlessDevice::default());
    let (_provisioner, resources) = provision(&device, 2, 2, 1);

    for id in [TargetId::Bloom, TargetId::BloomTmp, TargetId::SceneCopy] {
        let target = resources.targets.target(id);
        assert_eq!(target.desc.mip_level_count, 1, "{}", id.name());
        assert_eq!(target.sampled_views.as_slice(), &[0]);
        assert_eq!(target.storage_views.as_slice(), &[0]);
    }

    // Plain targets are bound whole.
    let color = resources.targets.target(TargetId::GbufferColor);
    assert!(color.sampled_views.is_empty());
    assert!(color.storage_views.is_empty());
}

// ============================================================================
// MSAA
// ============================================================================

#[test]
fn resolve_twins_exist_only_under_msaa() {
    let device = Arc::new(HeadlessDevice::full_featured());
    for samples in [1, 2, 4, 8] {
        let (_provisioner, resources) = provision(&device, 640, 360, samples);
        let targets = &resources.targets;
        assert_eq!(targets.needs_resolve(), samples > 1);

        for (id, target) in targets.iter() {
            let expects_twin = samples > 1 && MSAA_RESOLVED_TARGETS.contains(id);
            assert_eq!(target.resolved.is_some(), expects_twin, "{} x{samples}", id.name());
            if let Some(resolved) = target.resolved {
                let twin = device.texture(resolved).unwrap();
                assert_eq!(twin.desc.sample_count, 1);
                assert_eq!((twin.desc.width, twin.desc.height), (640, 360));
                assert_eq!(targets.read(*id), resolved);
            } else {
                assert_eq!(targets.read(*id), target.texture);
            }
        }

        for id in RenderPassId::ALL {
            let resolves = resources.passes.get(id).resolves().count();
            if samples == 1 {
                assert_eq!(resolves, 0, "{} has resolves at 1x", id.name());
            }
        }
        if samples > 1 {
            assert_eq!(resources.passes.get(RenderPassId::Main).resolves().count(), 2);
            assert_eq!(resources.passes.get(RenderPassId::Transparent).resolves().count(), 1);
            assert_eq!(resources.passes.get(RenderPassId::LightShafts).resolves().count(), 1);
            assert_eq!(
                resources.passes.get(RenderPassId::ParticleDistortion).resolves().count(),
                1
            );
        }
    }
}

#[test]
fn multisampled_targets_and_histories() {
    let device = Arc::new(HeadlessDevice::default());
    let (_provisioner, resources) = provision(&device, 320, 180, 4);
    let targets = &resources.targets;

    for id in MSAA_RESOLVED_TARGETS {
        assert_eq!(targets.target(id).desc.sample_count, 4);
    }
    assert_eq!(targets.target(TargetId::Depth).desc.sample_count, 4);
    let history = &targets.target(TargetId::DepthHistory0).desc;
    assert_eq!(history.sample_count, 1);
    assert_eq!(history.format, wgpu::TextureFormat::R32Float);
}

struct EmptyScene;

impl SceneProvider for EmptyScene {
    fn update(&mut self, _dt: f32) {}

    fn visibility(
        &self,
        _camera: &myth_renderpath::Camera,
        _layer_mask: u32,
        _flags: VisibilityFlags,
    ) -> VisibilityResult {
        VisibilityResult::default()
    }

    fn sun_direction(&self) -> Option<glam::Vec3> {
        None
    }
}

#[test]
fn depth_history_is_resolved_under_msaa_and_copied_otherwise() {
    for samples in [1, 4] {
        let device = Arc::new(HeadlessDevice::default());
        let dyn_device: Arc<dyn GraphicsDevice> = device.clone();
        let mut settings = RenderPathSettings::minimal();
        settings.msaa_samples = samples;
        let mut path = RenderPath3D::new(
            dyn_device,
            Box::new(EmptyScene),
            settings,
            Resolution::new(320, 180).unwrap(),
            WorkerPool::inline(),
        )
        .unwrap();
        path.update(0.016);
        path.render().unwrap();

        let history = path.rotator().depth_current();
        let batch = device.last_batch().unwrap();
        let depth = batch
            .iter()
            .find(|list| list.label() == StageId::DepthPrepassAndLinearization.name())
            .unwrap();
        let resolve = depth.passes().find(|p| p.kind == PassKind::ResolveMsaaDepth);
        let copied = depth
            .commands()
            .iter()
            .any(|c| matches!(c, Command::Copy { .. }));

        if samples > 1 {
            assert_eq!(resolve.unwrap().outputs.as_slice(), &[history]);
            assert!(!copied);
        } else {
            assert!(resolve.is_none());
            assert!(copied);
        }
    }
}

#[test]
fn resize_releases_every_previous_texture() {
    let device = Arc::new(HeadlessDevice::default());
    let (mut provisioner, first) = provision(&device, 640, 360, 4);
    let baseline = device.live_texture_count();
    let old: Vec<_> = first.targets.textures().collect();

    provisioner
        .provision(
            Resolution::new(1280, 720).unwrap(),
            4,
            device.capabilities(),
        )
        .unwrap();
    assert_eq!(device.live_texture_count(), baseline);
    assert!(old.iter().all(|&t| !device.is_live(t)));

    drop(provisioner);
    assert_eq!(device.live_texture_count(), 0);
}
