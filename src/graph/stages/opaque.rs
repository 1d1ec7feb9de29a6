use crate::device::{BindSlot, CommandList, PassInvocation, PassKind, ResourceLayout};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};
use crate::resources::{RenderPassId, TargetId};

use super::{compute_write, in_render_pass, with_access};

/// Tiled light culling, optional shading-rate classification and the main
/// opaque pass.
pub struct LightCullingOpaqueStage;

impl StageNode for LightCullingOpaqueStage {
    fn id(&self) -> StageId {
        StageId::LightCullingAndOpaque
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        let targets = ctx.targets();
        let depth = ctx.rotator.depth_current();
        let debug = targets.handle(TargetId::DebugVisualization);
        let mut report = StageReport::default();

        list.push_debug_group("Light Culling");
        let culling = PassInvocation::new(PassKind::TiledLightCulling).input(depth);
        if ctx.settings.debug_light_culling {
            compute_write(list, debug, culling.output(debug));
            report.debug_output = Some(debug);
        } else {
            list.dispatch(culling);
        }
        list.pop_debug_group();

        let shading_rate = if ctx.variable_rate_shading_active() {
            let rate = targets.handle(TargetId::ShadingRate);
            list.push_debug_group("Shading Rate Classification");
            with_access(
                list,
                rate,
                ResourceLayout::ShadingRateSource,
                ResourceLayout::General,
                PassInvocation::new(PassKind::ShadingRateClassification)
                    .input(targets.read(TargetId::GbufferNormalVelocity))
                    .output(rate),
            );
            if ctx.settings.debug_shading_rate {
                compute_write(
                    list,
                    debug,
                    PassInvocation::new(PassKind::ShadingRateClassification)
                        .input(rate)
                        .output(debug),
                );
                report.debug_output = Some(debug);
            }
            list.pop_debug_group();
            list.bind_shading_rate_image(Some(rate));
            Some(rate)
        } else {
            None
        };

        let ao = if ctx.ambient_occlusion_pass().is_some() {
            targets.handle(TargetId::AmbientOcclusion)
        } else {
            ctx.placeholders.white
        };
        let reflection = if ctx.planar_reflections_active() {
            targets.handle(TargetId::Reflection)
        } else {
            ctx.placeholders.transparent
        };

        list.push_debug_group("Opaque Scene");
        in_render_pass(ctx, list, RenderPassId::Main, |list, _| {
            list.bind_texture(BindSlot::AmbientOcclusion, ao);
            list.bind_texture(BindSlot::Reflection, reflection);
            list.dispatch(
                PassInvocation::new(PassKind::DrawSceneOpaque)
                    .input(ao)
                    .input(reflection)
                    .param(ctx.frame.visibility.objects.len() as f32),
            );
            list.dispatch(PassInvocation::new(PassKind::DrawSky));
        });
        list.pop_debug_group();

        if shading_rate.is_some() {
            list.bind_shading_rate_image(None);
        }

        let outline = ctx.settings.outline;
        if outline.enabled {
            let [r, g, b, a] = outline.color;
            list.push_debug_group("Outline");
            list.dispatch(
                PassInvocation::new(PassKind::Outline)
                    .input(ctx.rotator.depth_current())
                    .params(&[outline.threshold, outline.thickness, r, g, b, a]),
            );
            list.pop_debug_group();
        }

        Ok(report)
    }
}
