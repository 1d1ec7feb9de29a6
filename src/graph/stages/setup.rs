use crate::device::{CapabilityFlags, CommandList, PassInvocation, PassKind};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};
use crate::resources::RenderPassId;

use super::in_render_pass;

/// Render data upload, acceleration structures and occlusion queries.
///
/// Occlusion is tested with the *previous* frame's camera against the depth
/// history written last frame, paired with this frame's visible set.
pub struct SetupStage;

impl StageNode for SetupStage {
    fn id(&self) -> StageId {
        StageId::Setup
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        let frame = &ctx.frame;

        list.push_debug_group("Setup");
        list.dispatch(
            PassInvocation::new(PassKind::UpdateRenderData)
                .param(frame.delta_time)
                .param(frame.visibility.objects.len() as f32),
        );

        if ctx.settings.wants_raytracing() && ctx.supports(CapabilityFlags::RAYTRACING) {
            list.dispatch(PassInvocation::new(PassKind::UpdateAccelerationStructures));
        }

        let previous_depth = ctx.rotator.depth_previous();
        let eye = frame.previous_camera.position();
        in_render_pass(ctx, list, RenderPassId::OcclusionCulling, |list, _| {
            list.dispatch(
                PassInvocation::new(PassKind::OcclusionCulling)
                    .input(previous_depth)
                    .params(&[eye.x, eye.y, eye.z])
                    .param(frame.visibility.objects.len() as f32),
            );
        });
        list.pop_debug_group();

        Ok(StageReport::default())
    }
}
