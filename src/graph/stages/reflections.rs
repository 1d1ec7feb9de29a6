use crate::device::{CommandList, PassInvocation, PassKind};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};
use crate::resources::RenderPassId;

use super::in_render_pass;

/// Scene rendered from the main camera mirrored across the visible
/// reflection plane.
pub struct PlanarReflectionStage;

impl StageNode for PlanarReflectionStage {
    fn id(&self) -> StageId {
        StageId::PlanarReflections
    }

    fn admit(&self, ctx: &StageContext) -> bool {
        ctx.planar_reflections_active()
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        let (Some(camera), Some(visibility)) = (
            ctx.frame.reflection_camera.as_ref(),
            ctx.frame.reflection_visibility.as_ref(),
        ) else {
            return Err(StageError::new(
                StageId::PlanarReflections,
                "reflection plane visible but no reflected viewpoint was prepared",
            ));
        };

        let eye = camera.position();
        list.push_debug_group("Planar Reflections");
        in_render_pass(ctx, list, RenderPassId::Reflection, |list, _| {
            list.dispatch(
                PassInvocation::new(PassKind::DrawSceneReflection)
                    .params(&[eye.x, eye.y, eye.z])
                    .param(visibility.objects.len() as f32),
            );
            list.dispatch(PassInvocation::new(PassKind::DrawSky));
        });
        list.pop_debug_group();
        Ok(StageReport::default())
    }
}
