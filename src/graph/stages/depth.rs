//! Depth prepass and everything derived from depth.
//!
//! 1. Camera buffer update (jittered when temporal AA is on).
//! 2. Depth-only pass into the (possibly multisampled) depth buffer.
//! 3. Copy into this frame's depth-history slot: a plain copy at 1x, a resolve
//!    pass under MSAA.
//! 4. Linear depth mip chain from the history copy.
//! 5. Ambient occlusion, when the selected mode can run on this device.

use crate::device::{Barrier, CommandList, PassInvocation, PassKind, ResourceLayout};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};
use crate::resources::{RenderPassId, TargetId};
use crate::settings::AoMode;

use super::{compute_write, in_render_pass};

pub struct DepthPrepassStage;

impl StageNode for DepthPrepassStage {
    fn id(&self) -> StageId {
        StageId::DepthPrepassAndLinearization
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        let targets = ctx.targets();
        let depth = targets.handle(TargetId::Depth);
        let history = ctx.rotator.depth_current();
        let linear_depth = targets.handle(TargetId::LinearDepth);
        let jitter = ctx.frame.camera.jitter();

        list.push_debug_group("Depth Prepass");
        list.dispatch(PassInvocation::new(PassKind::UpdateCameraBuffer).params(&[jitter.x, jitter.y]));
        in_render_pass(ctx, list, RenderPassId::DepthPrepass, |list, _| {
            list.dispatch(
                PassInvocation::new(PassKind::DrawSceneDepth)
                    .param(ctx.frame.visibility.objects.len() as f32),
            );
        });
        list.pop_debug_group();

        list.push_debug_group("Depth History");
        if targets.needs_resolve() {
            compute_write(
                list,
                history,
                PassInvocation::new(PassKind::ResolveMsaaDepth)
                    .input(depth)
                    .output(history),
            );
        } else {
            list.barrier(&[
                Barrier::image(depth, ResourceLayout::DepthStencilReadOnly, ResourceLayout::CopySrc),
                Barrier::image(history, ResourceLayout::ShaderResource, ResourceLayout::CopyDst),
            ]);
            list.copy(depth, history);
            list.barrier(&[
                Barrier::image(depth, ResourceLayout::CopySrc, ResourceLayout::DepthStencilReadOnly),
                Barrier::image(history, ResourceLayout::CopyDst, ResourceLayout::ShaderResource),
            ]);
        }
        list.pop_debug_group();

        list.push_debug_group("Linear Depth");
        compute_write(
            list,
            linear_depth,
            PassInvocation::new(PassKind::LinearDepth)
                .input(history)
                .output(linear_depth)
                .params(&[ctx.frame.camera.near, ctx.frame.camera.far]),
        );
        list.pop_debug_group();

        match ctx.ambient_occlusion_pass() {
            Some(kind) => {
                let ao = targets.handle(TargetId::AmbientOcclusion);
                let settings = ctx.settings.ambient_occlusion;
                let mut pass = PassInvocation::new(kind).input(history).input(linear_depth);
                if kind == PassKind::Rtao {
                    // Temporal accumulation against last frame's depth.
                    pass = pass.input(ctx.rotator.depth_previous());
                }
                let pass = pass
                    .output(ao)
                    .params(&[settings.range, settings.sample_count as f32, settings.power]);

                list.push_debug_group("Ambient Occlusion");
                compute_write(list, ao, pass);
                list.pop_debug_group();
            }
            None if ctx.settings.ambient_occlusion.mode == AoMode::Rtao => {
                log::warn!("Ray-traced AO requested without ray-tracing support; binding white AO");
            }
            None => {}
        }

        Ok(StageReport::default())
    }
}
