//! Render Path Orchestration Tests
//!
//! Tests for:
//! - Stage admission for the reference 1080p configuration
//! - Placeholder substitution for disabled AO / reflections
//! - Depth-history rotation and which instant each stage reads
//! - Submission order versus completion order
//! - Frame abandonment on a stage failure
//! - Resize refusal while a frame is in flight
//! - Release of the path when a frame is dropped or a stage panics
//! - Temporal AA ping-pong across submitted frames

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Vec3, Vec4};

use myth_renderpath::device::{BindSlot, Command, CommandList, PassInvocation, PassKind};
use myth_renderpath::graph::stages::{PostOpaqueStage, SetupStage};
use myth_renderpath::graph::{StageContext, StageNode, StageReport};
use myth_renderpath::scene::Camera;
use myth_renderpath::{
    AoMode, CapabilityFlags, DeviceCapabilities, FrameOutcome, GraphicsDevice, HeadlessDevice,
    RenderPath3D, RenderPathError, RenderPathSettings, Resolution, SceneProvider, StageError,
    StageId, TargetId, TextureHandle, VisibilityFlags, VisibilityResult, WorkerPool,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Scene returning a fixed visibility result.
#[derive(Default)]
struct ScriptedScene {
    visibility: VisibilityResult,
    sun: Option<Vec3>,
    updates: Arc<AtomicUsize>,
}

impl SceneProvider for ScriptedScene {
    fn update(&mut self, _dt: f32) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn visibility(&self, _camera: &Camera, _layer_mask: u32, flags: VisibilityFlags) -> VisibilityResult {
        let mut result = self.visibility.clone();
        if !flags.contains(VisibilityFlags::REQUEST_REFLECTION) {
            result.reflection_plane = None;
        }
        result
    }

    fn sun_direction(&self) -> Option<Vec3> {
        self.sun
    }
}

fn visible_objects(count: u32) -> VisibilityResult {
    VisibilityResult {
        objects: (0..count).collect(),
        ..VisibilityResult::default()
    }
}

fn build(
    device: &Arc<HeadlessDevice>,
    scene: ScriptedScene,
    settings: RenderPathSettings,
    width: u32,
    height: u32,
    pool: WorkerPool,
) -> RenderPath3D {
    let dyn_device: Arc<dyn GraphicsDevice> = device.clone();
    RenderPath3D::new(
        dyn_device,
        Box::new(scene),
        settings,
        Resolution::new(width, height).unwrap(),
        pool,
    )
    .unwrap()
}

fn small(device: &Arc<HeadlessDevice>, settings: RenderPathSettings) -> RenderPath3D {
    build(device, ScriptedScene::default(), settings, 320, 180, WorkerPool::new(2))
}

fn stage_list(batch: &[CommandList], stage: StageId) -> &CommandList {
    batch
        .iter()
        .find(|list| list.label() == stage.name())
        .unwrap_or_else(|| panic!("no list recorded for {}", stage.name()))
}

fn find_pass(list: &CommandList, kind: PassKind) -> Option<&PassInvocation> {
    list.passes().find(|p| p.kind == kind)
}

fn bound(list: &CommandList, slot: BindSlot) -> Option<TextureHandle> {
    list.commands().iter().find_map(|c| match c {
        Command::BindTexture { slot: s, texture } if *s == slot => *texture,
        _ => None,
    })
}

fn writes(list: &CommandList, texture: TextureHandle) -> bool {
    list.passes().any(|p| p.outputs.contains(&texture))
        || list.commands().iter().any(|c| match c {
            Command::Barrier(barriers) => barriers.iter().any(|b| b.texture == texture),
            Command::Copy { dst, .. } => *dst == texture,
            _ => false,
        })
}

// ============================================================================
// Reference scenario
// ============================================================================

#[test]
fn reference_1080p_scenario() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.bloom.enabled = true;
    settings.bloom.threshold = 1.0;
    assert_eq!(settings.ambient_occlusion.mode, AoMode::Disabled);
    assert!(!settings.temporal_aa);

    let mut path = build(
        &device,
        ScriptedScene {
            visibility: visible_objects(12),
            ..ScriptedScene::default()
        },
        settings,
        1920,
        1080,
        WorkerPool::new(3),
    );
    path.update(1.0 / 60.0);
    let report = path.render().unwrap();

    assert_eq!(report.outcome, FrameOutcome::Submitted);
    assert_eq!(
        report.executed,
        vec![
            StageId::Setup,
            StageId::CommonResourceRefresh,
            StageId::DepthPrepassAndLinearization,
            StageId::LightCullingAndOpaque,
            StageId::PostOpaque,
        ]
    );

    let chain = report.postprocess.unwrap();
    assert_eq!(
        chain.executed.as_slice(),
        &[
            PassKind::Bloom,
            PassKind::Tonemap,
            PassKind::Downsample4x,
            PassKind::Downsample4x,
            PassKind::GaussianBlur,
        ]
    );

    let output = device.texture(chain.output).unwrap();
    assert_eq!((output.desc.width, output.desc.height), (1920, 1080));
    assert_eq!(output.desc.format, device.display_format());
    assert_eq!(path.last_postprocess_output(), Some(chain.output));
    assert_eq!(path.blurred_background(), Some(chain.blurred_background));
    assert_eq!(device.frame_count(), 1);
}

#[test]
fn camera_jitter_follows_temporal_aa() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    path.update(0.016);
    assert_eq!(path.frame_state().camera.jitter(), glam::Vec2::ZERO);

    let mut settings = RenderPathSettings::minimal();
    settings.temporal_aa = true;
    path.set_settings(settings);
    path.update(0.016);
    assert_ne!(path.frame_state().camera.jitter(), glam::Vec2::ZERO);
}

// ============================================================================
// Admission and placeholders
// ============================================================================

fn temporal_aa_pass(device: &HeadlessDevice, frame: usize) -> PassInvocation {
    let batches = device.submitted_batches();
    let post = stage_list(&batches[frame], StageId::PostOpaque);
    find_pass(post, PassKind::TemporalAa).unwrap().clone()
}

#[test]
fn temporal_aa_alternates_between_submitted_frames() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.temporal_aa = true;
    let mut path = small(&device, settings);

    // No update in between: the counter comes from the device.
    path.update(0.016);
    path.render().unwrap();
    path.render().unwrap();

    let first = temporal_aa_pass(&device, 0);
    let second = temporal_aa_pass(&device, 1);
    assert_ne!(first.outputs[0], second.outputs[0]);
    assert_eq!(second.inputs[1], first.outputs[0]);
    assert_eq!(first.inputs[1], second.outputs[0]);
}

#[test]
fn abandoned_frames_do_not_flip_temporal_aa() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.temporal_aa = true;
    let mut path = small(&device, settings);

    path.update(0.016);
    path.render().unwrap();

    let original = path
        .replace_stage(Arc::new(FailingStage(StageId::CommonResourceRefresh)))
        .unwrap();
    path.update(0.016);
    assert!(matches!(path.render().unwrap().outcome, FrameOutcome::Abandoned(_)));

    path.replace_stage(original);
    path.update(0.016);
    path.render().unwrap();

    let first = temporal_aa_pass(&device, 0);
    let next = temporal_aa_pass(&device, 1);
    assert_eq!(next.inputs[1], first.outputs[0]);
}

#[test]
fn disabled_ao_writes_nothing_and_binds_white() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    path.update(0.016);
    path.render().unwrap();

    let ao = path.resources().unwrap().targets.handle(TargetId::AmbientOcclusion);
    let batch = device.last_batch().unwrap();
    assert!(batch.iter().all(|list| !writes(list, ao)));

    let opaque = stage_list(&batch, StageId::LightCullingAndOpaque);
    assert_eq!(
        bound(opaque, BindSlot::AmbientOcclusion),
        Some(path.placeholders().white)
    );
}

#[test]
fn enabled_ao_is_written_before_it_is_bound() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.ambient_occlusion.mode = AoMode::Hbao;
    let mut path = small(&device, settings);
    path.update(0.016);
    path.render().unwrap();

    let ao = path.resources().unwrap().targets.handle(TargetId::AmbientOcclusion);
    let batch = device.last_batch().unwrap();
    let depth = stage_list(&batch, StageId::DepthPrepassAndLinearization);
    let hbao = find_pass(depth, PassKind::Hbao).unwrap();
    assert_eq!(hbao.outputs.as_slice(), &[ao]);

    let opaque = stage_list(&batch, StageId::LightCullingAndOpaque);
    assert_eq!(bound(opaque, BindSlot::AmbientOcclusion), Some(ao));
}

#[test]
fn raytraced_ao_without_support_falls_back_to_white() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.ambient_occlusion.mode = AoMode::Rtao;
    let mut path = small(&device, settings);
    path.update(0.016);
    path.render().unwrap();

    let batch = device.last_batch().unwrap();
    let depth = stage_list(&batch, StageId::DepthPrepassAndLinearization);
    assert!(find_pass(depth, PassKind::Rtao).is_none());
    let setup = stage_list(&batch, StageId::Setup);
    assert!(find_pass(setup, PassKind::UpdateAccelerationStructures).is_none());

    let opaque = stage_list(&batch, StageId::LightCullingAndOpaque);
    assert_eq!(
        bound(opaque, BindSlot::AmbientOcclusion),
        Some(path.placeholders().white)
    );
}

#[test]
fn raytraced_shadows_replace_shadow_maps_only_when_supported() {
    let mut settings = RenderPathSettings::minimal();
    settings.shadows = true;
    settings.raytraced_shadows = true;

    let plain = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&plain, settings.clone());
    path.update(0.016);
    assert!(path.render().unwrap().executed.contains(&StageId::ShadowMaps));

    let rt = Arc::new(HeadlessDevice::full_featured());
    let mut path = small(&rt, settings);
    path.update(0.016);
    let report = path.render().unwrap();
    assert!(!report.executed.contains(&StageId::ShadowMaps));
    let batch = rt.last_batch().unwrap();
    let setup = stage_list(&batch, StageId::Setup);
    assert!(find_pass(setup, PassKind::UpdateAccelerationStructures).is_some());
}

#[test]
fn planar_reflection_admission_follows_visibility() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.reflections = true;

    let scene = ScriptedScene {
        visibility: VisibilityResult {
            reflection_plane: Some(Vec4::new(0.0, 1.0, 0.0, 0.0)),
            ..visible_objects(4)
        },
        ..ScriptedScene::default()
    };
    let mut path = build(&device, scene, settings, 320, 180, WorkerPool::new(2));
    path.update(0.016);
    let report = path.render().unwrap();
    assert!(report.executed.contains(&StageId::PlanarReflections));
    assert!(path.frame_state().reflection_camera.is_some());

    let reflection = path.resources().unwrap().targets.handle(TargetId::Reflection);
    let batch = device.last_batch().unwrap();
    let opaque = stage_list(&batch, StageId::LightCullingAndOpaque);
    assert_eq!(bound(opaque, BindSlot::Reflection), Some(reflection));

    // Same scene with the feature off: no stage, transparent stand-in.
    let mut settings = RenderPathSettings::minimal();
    settings.reflections = false;
    path.set_settings(settings);
    path.update(0.016);
    let report = path.render().unwrap();
    assert!(!report.executed.contains(&StageId::PlanarReflections));
    let batch = device.last_batch().unwrap();
    let opaque = stage_list(&batch, StageId::LightCullingAndOpaque);
    assert_eq!(
        bound(opaque, BindSlot::Reflection),
        Some(path.placeholders().transparent)
    );
    let post = stage_list(&batch, StageId::PostOpaque);
    assert_eq!(
        bound(post, BindSlot::ScreenSpaceReflection),
        Some(path.placeholders().transparent)
    );
}

#[test]
fn light_shafts_need_the_sun_in_front() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.light_shafts = true;

    // The default camera looks down -Z.
    for (sun, expected) in [(Vec3::NEG_Z, true), (Vec3::Z, false)] {
        let scene = ScriptedScene {
            sun: Some(sun),
            ..ScriptedScene::default()
        };
        let mut path = build(&device, scene, settings.clone(), 320, 180, WorkerPool::inline());
        path.update(0.016);
        path.render().unwrap();

        let batch = device.last_batch().unwrap();
        let post = stage_list(&batch, StageId::PostOpaque);
        assert_eq!(find_pass(post, PassKind::LightShafts).is_some(), expected);
        assert_eq!(find_pass(post, PassKind::AdditiveBlit).is_some(), expected);
    }
}

#[test]
fn debug_light_culling_exposes_visualisation() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut settings = RenderPathSettings::minimal();
    settings.debug_light_culling = true;
    let mut path = small(&device, settings);
    path.update(0.016);
    let report = path.render().unwrap();

    let debug = path.resources().unwrap().targets.handle(TargetId::DebugVisualization);
    assert_eq!(report.debug_output, Some(debug));
    assert_eq!(path.debug_output(), Some(debug));
}

#[test]
fn shading_rate_classification_needs_vrs_tier2() {
    let mut settings = RenderPathSettings::minimal();
    settings.variable_rate_shading = true;

    let device = Arc::new(HeadlessDevice::full_featured());
    let mut path = small(&device, settings.clone());
    path.update(0.016);
    path.render().unwrap();
    let batch = device.last_batch().unwrap();
    let opaque = stage_list(&batch, StageId::LightCullingAndOpaque);
    assert!(find_pass(opaque, PassKind::ShadingRateClassification).is_some());
    let rate = path.resources().unwrap().targets.handle(TargetId::ShadingRate);
    assert!(opaque
        .commands()
        .contains(&Command::BindShadingRateImage(Some(rate))));
    assert!(opaque.commands().contains(&Command::BindShadingRateImage(None)));

    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, settings);
    path.update(0.016);
    path.render().unwrap();
    let batch = device.last_batch().unwrap();
    let opaque = stage_list(&batch, StageId::LightCullingAndOpaque);
    assert!(find_pass(opaque, PassKind::ShadingRateClassification).is_none());
}

// ============================================================================
// Rotation
// ============================================================================

#[test]
fn setup_reads_last_frames_depth_and_prepass_writes_this_frames() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let scene = ScriptedScene::default();
    let updates = scene.updates.clone();
    let mut path = build(&device, scene, RenderPathSettings::minimal(), 320, 180, WorkerPool::new(2));

    let mut written = Vec::new();
    for _ in 0..3 {
        path.update(0.016);
        path.render().unwrap();

        let current = path.rotator().depth_current();
        let previous = path.rotator().depth_previous();
        assert_ne!(current, previous);

        let batch = device.last_batch().unwrap();
        let setup = stage_list(&batch, StageId::Setup);
        let culling = find_pass(setup, PassKind::OcclusionCulling).unwrap();
        assert_eq!(culling.inputs[0], previous);

        let depth = stage_list(&batch, StageId::DepthPrepassAndLinearization);
        assert!(depth
            .commands()
            .iter()
            .any(|c| matches!(c, Command::Copy { dst, .. } if *dst == current)));
        written.push(current);
    }

    // Each tick rotates exactly once: the written copy alternates.
    assert_ne!(written[0], written[1]);
    assert_eq!(written[0], written[2]);
    assert_eq!(path.rotator().rotations(), 3);
    assert_eq!(updates.load(Ordering::SeqCst), 3);
}

#[test]
fn rendering_without_update_does_not_rotate() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    path.update(0.016);
    let before = path.rotator().depth_current();
    path.render().unwrap();
    path.render().unwrap();
    assert_eq!(path.rotator().depth_current(), before);
    assert_eq!(path.rotator().rotations(), 1);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Setup body that blocks until the post-opaque body has run.
struct GatedSetup {
    inner: Arc<dyn StageNode>,
    release: flume::Receiver<()>,
}

impl StageNode for GatedSetup {
    fn id(&self) -> StageId {
        StageId::Setup
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        self.release
            .recv()
            .map_err(|_| StageError::new(StageId::Setup, "release dropped"))?;
        self.inner.record(ctx, list)
    }
}

struct ReleasingPostOpaque {
    inner: Arc<dyn StageNode>,
    release: flume::Sender<()>,
}

impl StageNode for ReleasingPostOpaque {
    fn id(&self) -> StageId {
        StageId::PostOpaque
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        let report = self.inner.record(ctx, list)?;
        self.release
            .send(())
            .map_err(|_| StageError::new(StageId::PostOpaque, "setup gone"))?;
        Ok(report)
    }
}

#[test]
fn submission_follows_open_order_even_when_setup_finishes_last() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    let (tx, rx) = flume::bounded(1);

    path.replace_stage(Arc::new(GatedSetup {
        inner: Arc::new(SetupStage),
        release: rx,
    }));
    path.replace_stage(Arc::new(ReleasingPostOpaque {
        inner: Arc::new(PostOpaqueStage),
        release: tx,
    }));

    path.update(0.016);
    let report = path.render().unwrap();

    assert_eq!(report.outcome, FrameOutcome::Submitted);
    assert_ne!(report.completion_order[0], StageId::Setup);
    assert_eq!(report.submission_order, report.executed);

    let batch = device.last_batch().unwrap();
    let labels: Vec<_> = batch.iter().map(CommandList::label).collect();
    let expected: Vec<_> = report.executed.iter().map(|s| s.name()).collect();
    assert_eq!(labels, expected);
    assert!(batch.windows(2).all(|w| w[0].sequence() < w[1].sequence()));
}

// ============================================================================
// Failure containment
// ============================================================================

struct FailingStage(StageId);

impl StageNode for FailingStage {
    fn id(&self) -> StageId {
        self.0
    }

    fn record(&self, _ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        list.push_debug_group("doomed");
        list.pop_debug_group();
        Err(StageError::new(self.0, "atlas overflow"))
    }
}

#[test]
fn failed_stage_abandons_the_whole_frame() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());

    path.update(0.016);
    path.render().unwrap();
    let first_output = path.last_postprocess_output();

    let original = path
        .replace_stage(Arc::new(FailingStage(StageId::CommonResourceRefresh)))
        .unwrap();
    path.update(0.016);
    let report = path.render().unwrap();

    match &report.outcome {
        FrameOutcome::Abandoned(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].stage, StageId::CommonResourceRefresh);
        }
        FrameOutcome::Submitted => panic!("frame should have been abandoned"),
    }
    assert!(report.submission_order.is_empty());
    assert!(report.postprocess.is_none());
    assert_eq!(device.frame_count(), 1);
    assert_eq!(path.last_postprocess_output(), first_output);

    // The next tick starts clean.
    path.replace_stage(original);
    path.update(0.016);
    assert_eq!(path.render().unwrap().outcome, FrameOutcome::Submitted);
    assert_eq!(device.frame_count(), 2);
}

struct PanickingStage;

impl StageNode for PanickingStage {
    fn id(&self) -> StageId {
        StageId::ShadowMaps
    }

    fn record(&self, _ctx: &StageContext, _list: &mut CommandList) -> Result<StageReport, StageError> {
        panic!("shadow atlas index diverged");
    }
}

#[test]
#[should_panic(expected = "shadow atlas index diverged")]
fn stage_panic_halts_the_caller() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    path.replace_stage(Arc::new(PanickingStage));
    path.update(0.016);
    let _ = path.render();
}

#[test]
fn submission_failure_is_an_error() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    path.update(0.016);
    device.fail_next_submit();
    assert!(matches!(path.render(), Err(RenderPathError::Submission(_))));
    assert!(!path.is_frame_in_flight());
    path.update(0.016);
    assert!(path.render().is_ok());
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_is_refused_while_a_frame_is_in_flight() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    path.update(0.016);

    let frame = path.begin_frame().unwrap();
    assert!(path.is_frame_in_flight());
    assert!(matches!(
        path.resize(640, 360),
        Err(RenderPathError::ResizeWhileFrameInFlight)
    ));
    assert!(matches!(path.begin_frame(), Err(RenderPathError::FrameInFlight)));
    path.end_frame(frame).unwrap();

    let old_color = path.resources().unwrap().targets.handle(TargetId::GbufferColor);
    path.resize(640, 360).unwrap();
    assert!(!device.is_live(old_color));

    let new_color = path.resources().unwrap().targets.handle(TargetId::GbufferColor);
    let desc = device.texture(new_color).unwrap().desc;
    assert_eq!((desc.width, desc.height), (640, 360));

    path.update(0.016);
    let report = path.render().unwrap();
    let output = device.texture(report.postprocess.unwrap().output).unwrap();
    assert_eq!((output.desc.width, output.desc.height), (640, 360));
}

#[test]
fn dropping_an_unfinished_frame_releases_the_path() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    path.update(0.016);

    let frame = path.begin_frame().unwrap();
    assert!(path.is_frame_in_flight());
    drop(frame);

    assert!(!path.is_frame_in_flight());
    assert_eq!(device.frame_count(), 0);
    path.resize(640, 360).unwrap();

    path.update(0.016);
    let frame = path.begin_frame().unwrap();
    let report = path.end_frame(frame).unwrap();
    assert_eq!(report.outcome, FrameOutcome::Submitted);
    assert_eq!(device.frame_count(), 1);
}

#[test]
fn stage_panic_releases_the_path() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    let original = path.replace_stage(Arc::new(PanickingStage)).unwrap();
    path.update(0.016);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| path.render()));
    assert!(outcome.is_err());
    assert!(!path.is_frame_in_flight());
    path.resize(640, 360).unwrap();

    path.replace_stage(original);
    path.update(0.016);
    assert_eq!(path.render().unwrap().outcome, FrameOutcome::Submitted);
}

#[test]
fn zero_sized_resize_is_rejected_and_keeps_resources() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    assert!(matches!(
        path.resize(0, 720),
        Err(RenderPathError::InvalidResolution { width: 0, height: 720 })
    ));
    assert!(path.resources().is_some());
    path.update(0.016);
    assert!(path.render().is_ok());
}

#[test]
fn failed_reprovision_blocks_rendering_until_next_resize() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());

    device.fail_texture("bloom.tmp");
    assert!(matches!(
        path.resize(640, 360),
        Err(RenderPathError::ResourceCreation { label: "bloom.tmp", .. })
    ));
    assert!(path.resources().is_none());
    assert!(matches!(path.render(), Err(RenderPathError::NotProvisioned)));
}

#[test]
fn msaa_change_applies_on_resize() {
    let device = Arc::new(HeadlessDevice::new(DeviceCapabilities::default()));
    let mut path = small(&device, RenderPathSettings::minimal());
    assert_eq!(path.resources().unwrap().targets.sample_count(), 1);

    let mut settings = RenderPathSettings::minimal();
    settings.msaa_samples = 4;
    path.set_settings(settings);
    assert_eq!(path.resources().unwrap().targets.sample_count(), 1);

    path.resize(320, 180).unwrap();
    assert_eq!(path.resources().unwrap().targets.sample_count(), 4);

    let mut settings = RenderPathSettings::minimal();
    settings.msaa_samples = 8;
    path.set_settings(settings);
    assert!(matches!(
        path.resize(320, 180),
        Err(RenderPathError::UnsupportedSampleCount(8))
    ));
    assert_eq!(path.resources().unwrap().targets.sample_count(), 4);
}

#[test]
fn ray_tracing_capability_enables_rt_reflections() {
    let device = Arc::new(HeadlessDevice::full_featured());
    assert!(device.capabilities().supports(CapabilityFlags::RAYTRACING));
    let mut settings = RenderPathSettings::minimal();
    settings.raytraced_reflections = true;
    let mut path = small(&device, settings);
    path.update(0.016);
    path.render().unwrap();

    let ssr = path.resources().unwrap().targets.handle(TargetId::Ssr);
    let batch = device.last_batch().unwrap();
    let post = stage_list(&batch, StageId::PostOpaque);
    assert_eq!(
        find_pass(post, PassKind::RtReflections).unwrap().outputs.as_slice(),
        &[ssr]
    );
    assert_eq!(bound(post, BindSlot::ScreenSpaceReflection), Some(ssr));
}
