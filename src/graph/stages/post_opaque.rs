//! Post-opaque stage: everything between the opaque pass and the final image.
//!
//! Sub-stages, in recording order:
//!
//! | Step | Condition |
//! |------|-----------|
//! | Downsampled depth | always |
//! | Light shafts | `light_shafts` and the sun faces the camera |
//! | Volumetric lights | `volumetric_lights` and visibility requested them |
//! | Water ripples | ripples visible |
//! | Scene copy + mip chain | always (refraction source) |
//! | SSR / RT reflections | `ssr` / `raytraced_reflections` |
//! | Transparent pass | always |
//! | Particle distortion | always |
//! | Postprocess chain | always |

use glam::Vec2;

use crate::device::{
    Barrier, BindSlot, CommandList, PassInvocation, PassKind, ResourceLayout, TextureHandle,
};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};
use crate::postprocess::{ChainContext, record_postprocess};
use crate::resources::{RenderPassId, TargetId};

use super::{compute_write, in_render_pass};

pub struct PostOpaqueStage;

impl StageNode for PostOpaqueStage {
    fn id(&self) -> StageId {
        StageId::PostOpaque
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        let targets = ctx.targets();
        let depth = ctx.rotator.depth_current();
        let shafts = ctx.light_shafts_active();
        let volumetric = ctx.volumetric_lights_active();
        let ripples = ctx.frame.visibility.water_ripples;

        list.push_debug_group("Downsample Depth");
        in_render_pass(ctx, list, RenderPassId::DownsampleDepth, |list, _| {
            list.dispatch(
                PassInvocation::new(PassKind::DownsampleDepth)
                    .input(depth)
                    .output(targets.handle(TargetId::SmallDepth)),
            );
        });
        list.pop_debug_group();

        if shafts {
            let sun = sun_screen_position(ctx);
            let sun_blur = targets.handle(TargetId::SunBlur);
            list.push_debug_group("Light Shafts");
            in_render_pass(ctx, list, RenderPassId::LightShafts, |list, _| {
                list.dispatch(PassInvocation::new(PassKind::DrawSun));
            });
            compute_write(
                list,
                sun_blur,
                PassInvocation::new(PassKind::LightShafts)
                    .input(targets.read(TargetId::Sun))
                    .output(sun_blur)
                    .params(&[sun.x, sun.y]),
            );
            list.pop_debug_group();
        }

        if volumetric {
            let light = targets.handle(TargetId::VolumetricLight);
            let tmp = targets.handle(TargetId::VolumetricLightTmp);
            list.push_debug_group("Volumetric Lights");
            in_render_pass(ctx, list, RenderPassId::VolumetricLight, |list, _| {
                list.dispatch(PassInvocation::new(PassKind::VolumetricLights).input(depth));
            });
            compute_pair(
                list,
                light,
                tmp,
                PassInvocation::new(PassKind::BilateralBlur)
                    .input(light)
                    .input(targets.handle(TargetId::LinearDepth))
                    .output(tmp)
                    .output(light),
            );
            list.pop_debug_group();
        }

        if ripples {
            list.push_debug_group("Water Ripples");
            in_render_pass(ctx, list, RenderPassId::WaterRipples, |list, _| {
                list.dispatch(PassInvocation::new(PassKind::DrawWaterRipples));
            });
            list.pop_debug_group();
        }

        let scene_copy = targets.handle(TargetId::SceneCopy);
        list.push_debug_group("Scene Copy");
        in_render_pass(ctx, list, RenderPassId::DownsampleScene, |list, _| {
            list.dispatch(
                PassInvocation::new(PassKind::DownsampleScene)
                    .input(targets.read(TargetId::GbufferColor))
                    .output(scene_copy),
            );
        });
        let scene_tmp = targets.handle(TargetId::SceneCopyTmp);
        compute_pair(
            list,
            scene_copy,
            scene_tmp,
            PassInvocation::new(PassKind::GenerateMipChain)
                .output(scene_copy)
                .output(scene_tmp),
        );
        list.pop_debug_group();

        let ssr = if let Some(kind) = ctx.reflection_pass() {
            let ssr = targets.handle(TargetId::Ssr);
            list.push_debug_group("Screen Space Reflections");
            compute_write(
                list,
                ssr,
                PassInvocation::new(kind)
                    .input(scene_copy)
                    .input(depth)
                    .input(targets.handle(TargetId::LinearDepth))
                    .input(targets.read(TargetId::GbufferNormalVelocity))
                    .output(ssr),
            );
            list.pop_debug_group();
            ssr
        } else {
            ctx.placeholders.transparent
        };
        let reflection = if ctx.planar_reflections_active() {
            targets.handle(TargetId::Reflection)
        } else {
            ctx.placeholders.transparent
        };

        list.push_debug_group("Transparent Scene");
        in_render_pass(ctx, list, RenderPassId::Transparent, |list, _| {
            list.bind_texture(BindSlot::Refraction, scene_copy);
            list.bind_texture(BindSlot::ScreenSpaceReflection, ssr);
            list.bind_texture(BindSlot::Reflection, reflection);
            if ripples {
                list.bind_texture(BindSlot::WaterRipples, targets.handle(TargetId::WaterRipple));
            }
            list.dispatch(PassInvocation::new(PassKind::DrawSceneTransparent));
            list.dispatch(PassInvocation::new(PassKind::DrawLightVisualizers));
            list.dispatch(PassInvocation::new(PassKind::DrawSoftParticles).input(depth));

            if shafts {
                list.dispatch(
                    PassInvocation::new(PassKind::AdditiveBlit)
                        .input(targets.handle(TargetId::SunBlur)),
                );
            }
            if volumetric {
                list.dispatch(
                    PassInvocation::new(PassKind::BilateralUpsample)
                        .input(targets.handle(TargetId::VolumetricLight))
                        .input(targets.handle(TargetId::LinearDepth)),
                );
            }
            if ctx.settings.lens_flare {
                list.dispatch(PassInvocation::new(PassKind::DrawLensFlares).input(depth));
            }
        });
        list.pop_debug_group();

        list.push_debug_group("Particle Distortion");
        in_render_pass(ctx, list, RenderPassId::ParticleDistortion, |list, _| {
            list.dispatch(PassInvocation::new(PassKind::DrawDistortionParticles));
        });
        list.pop_debug_group();

        let chain = ChainContext {
            settings: ctx.settings.as_ref(),
            targets,
            placeholders: &ctx.placeholders,
            temporal_aa: *ctx.rotator.temporal_aa(),
            color_grading_lut: ctx.color_grading_lut,
            frame_counter: ctx.frame_counter,
        };
        let summary = record_postprocess(&chain, list);

        Ok(StageReport {
            postprocess: Some(summary),
            debug_output: None,
        })
    }
}

/// Compute pass reading and writing both `a` and `b`.
fn compute_pair(list: &mut CommandList, a: TextureHandle, b: TextureHandle, pass: PassInvocation) {
    use ResourceLayout as L;

    list.barrier(&[
        Barrier::image(a, L::ShaderResource, L::General),
        Barrier::image(b, L::ShaderResource, L::General),
    ]);
    list.dispatch(pass);
    list.barrier(&[
        Barrier::image(a, L::General, L::ShaderResource),
        Barrier::image(b, L::General, L::ShaderResource),
    ]);
}

/// Sun position in texture space (`[0, 1]²`, y down).
fn sun_screen_position(ctx: &StageContext) -> Vec2 {
    let camera = &ctx.frame.camera;
    let Some(sun) = ctx.frame.sun_direction else {
        return Vec2::splat(0.5);
    };
    let ndc = camera
        .view_projection_matrix()
        .project_point3(camera.position() + sun * camera.far);
    Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5)
}
