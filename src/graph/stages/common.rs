use crate::device::{CommandList, PassInvocation, PassKind};
use crate::errors::StageError;
use crate::graph::{StageContext, StageId, StageNode, StageReport};

/// Refresh of resources shared by every later stage. Always admitted.
pub struct CommonResourceRefreshStage;

impl StageNode for CommonResourceRefreshStage {
    fn id(&self) -> StageId {
        StageId::CommonResourceRefresh
    }

    fn record(&self, _ctx: &StageContext, list: &mut CommandList) -> Result<StageReport, StageError> {
        list.push_debug_group("Common Resources");
        for kind in [
            PassKind::RefreshDecalAtlas,
            PassKind::RefreshLightmapAtlas,
            PassKind::RefreshEnvProbes,
            PassKind::RefreshImpostors,
        ] {
            list.dispatch(PassInvocation::new(kind));
        }
        list.pop_debug_group();
        Ok(StageReport::default())
    }
}
