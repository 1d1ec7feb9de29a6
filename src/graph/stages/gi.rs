use crate::device::{CommandList, PassInvocation, PassKind};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};

pub struct GlobalIlluminationStage;

impl StageNode for GlobalIlluminationStage {
    fn id(&self) -> StageId {
        StageId::GlobalIllumination
    }

    fn admit(&self, ctx: &StageContext) -> bool {
        ctx.settings.voxel_gi
    }

    fn record(&self, _ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        list.push_debug_group("Voxel Radiance");
        list.dispatch(PassInvocation::new(PassKind::VoxelRadiance));
        list.pop_debug_group();
        Ok(StageReport::default())
    }
}
