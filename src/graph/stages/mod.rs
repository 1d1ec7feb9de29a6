//! Built-in stage bodies of the 3D frame, one module per [`StageId`].

mod common;
mod depth;
mod gi;
mod opaque;
mod post_opaque;
mod reflections;
mod setup;
mod shadows;

use std::sync::Arc;

pub use common::CommonResourceRefreshStage;
pub use depth::DepthPrepassStage;
pub use gi::GlobalIlluminationStage;
pub use opaque::LightCullingOpaqueStage;
pub use post_opaque::PostOpaqueStage;
pub use reflections::PlanarReflectionStage;
pub use setup::SetupStage;
pub use shadows::ShadowMapStage;

use super::{SharedStageNode, StageId};
use crate::device::{Barrier, CommandList, PassInvocation, ResourceLayout, TextureHandle};
use crate::resources::{RenderPassDesc, RenderPassId};

use super::StageContext;

/// The standard stage set, in declaration order.
#[must_use]
pub fn standard_stages() -> Vec<SharedStageNode> {
    let stages: Vec<SharedStageNode> = vec![
        Arc::new(SetupStage),
        Arc::new(ShadowMapStage),
        Arc::new(GlobalIlluminationStage),
        Arc::new(CommonResourceRefreshStage),
        Arc::new(PlanarReflectionStage),
        Arc::new(DepthPrepassStage),
        Arc::new(LightCullingOpaqueStage),
        Arc::new(PostOpaqueStage),
    ];
    debug_assert!(stages.iter().map(|s| s.id()).eq(StageId::ALL));
    stages
}

/// Runs `body` inside a render pass from the table.
fn in_render_pass(
    ctx: &StageContext,
    list: &mut CommandList,
    id: RenderPassId,
    body: impl FnOnce(&mut CommandList, &RenderPassDesc),
) {
    let desc = ctx.passes().get(id);
    list.begin_render_pass(desc);
    body(list, desc);
    list.end_render_pass();
}

/// Dispatches `pass` with `target` transitioned from `resting` to `access`
/// and back.
fn with_access(
    list: &mut CommandList,
    target: TextureHandle,
    resting: ResourceLayout,
    access: ResourceLayout,
    pass: PassInvocation,
) {
    list.barrier(&[Barrier::image(target, resting, access)]);
    list.dispatch(pass);
    list.barrier(&[Barrier::image(target, access, resting)]);
}

/// Compute write into a target that rests as a shader resource.
fn compute_write(list: &mut CommandList, target: TextureHandle, pass: PassInvocation) {
    with_access(
        list,
        target,
        ResourceLayout::ShaderResource,
        ResourceLayout::General,
        pass,
    );
}
