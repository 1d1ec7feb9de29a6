use crate::device::{CapabilityFlags, CommandList, PassInvocation, PassKind};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};

/// Shadow maps, skipped entirely when ray-traced shadows replace them.
pub struct ShadowMapStage;

impl StageNode for ShadowMapStage {
    fn id(&self) -> StageId {
        StageId::ShadowMaps
    }

    fn admit(&self, ctx: &StageContext) -> bool {
        let raytraced = ctx.settings.raytraced_shadows && ctx.supports(CapabilityFlags::RAYTRACING);
        ctx.settings.shadows && !raytraced
    }

    fn record(&self, ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        list.push_debug_group("Shadow Maps");
        list.dispatch(
            PassInvocation::new(PassKind::ShadowMaps)
                .param(ctx.frame.visibility.objects.len() as f32),
        );
        list.pop_debug_group();
        Ok(StageReport::default())
    }
}
