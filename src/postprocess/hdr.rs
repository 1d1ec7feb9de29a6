//! Extended-range steps.

use super::{ChainContext, PostprocessChain};
use crate::device::{CommandList, PassInvocation, PassKind};
use crate::resources::TargetId;

pub(super) fn volumetric_clouds(
    ctx: &ChainContext<'_>,
    chain: &mut PostprocessChain,
    list: &mut CommandList,
) {
    if !ctx.settings.volumetric_clouds {
        return;
    }
    let depth = ctx.targets.handle(TargetId::LinearDepth);
    chain.step(list, |input, output| {
        PassInvocation::new(PassKind::VolumetricClouds)
            .input(input)
            .input(depth)
            .output(output)
    });
}

/// Resolves against the frame-parity history and overrides the next input.
pub(super) fn temporal_aa(
    ctx: &ChainContext<'_>,
    chain: &mut PostprocessChain,
    list: &mut CommandList,
) {
    if !ctx.settings.temporal_aa {
        return;
    }
    let output = ctx.temporal_aa.output(ctx.frame_counter);
    let history = ctx.temporal_aa.history(ctx.frame_counter);
    let input = chain.take_input();

    chain.record(
        list,
        PassInvocation::new(PassKind::TemporalAa)
            .input(input)
            .input(history)
            .input(ctx.targets.handle(TargetId::LinearDepth))
            .input(ctx.targets.read(TargetId::GbufferNormalVelocity))
            .output(output),
    );
    chain.set_override(output);
}

pub(super) fn depth_of_field(
    ctx: &ChainContext<'_>,
    chain: &mut PostprocessChain,
    list: &mut CommandList,
) {
    let dof = ctx.settings.depth_of_field;
    if !dof.enabled {
        return;
    }
    let depth = ctx.targets.handle(TargetId::LinearDepth);
    chain.step(list, |input, output| {
        PassInvocation::new(PassKind::DepthOfField)
            .input(input)
            .input(depth)
            .output(output)
            .params(&[dof.focus, dof.strength, dof.aspect])
    });
}

pub(super) fn motion_blur(
    ctx: &ChainContext<'_>,
    chain: &mut PostprocessChain,
    list: &mut CommandList,
) {
    let blur = ctx.settings.motion_blur;
    if !blur.enabled {
        return;
    }
    let depth = ctx.targets.handle(TargetId::LinearDepth);
    let velocity = ctx.targets.read(TargetId::GbufferNormalVelocity);
    chain.step(list, |input, output| {
        PassInvocation::new(PassKind::MotionBlur)
            .input(input)
            .input(depth)
            .input(velocity)
            .output(output)
            .param(blur.strength)
    });
}

pub(super) fn bloom(ctx: &ChainContext<'_>, chain: &mut PostprocessChain, list: &mut CommandList) {
    let bloom = ctx.settings.bloom;
    if !bloom.enabled {
        return;
    }
    let mips = ctx.targets.handle(TargetId::Bloom);
    let tmp = ctx.targets.handle(TargetId::BloomTmp);
    chain.step(list, |input, output| {
        PassInvocation::new(PassKind::Bloom)
            .input(input)
            .input(mips)
            .input(tmp)
            .output(output)
            .param(bloom.threshold)
    });
}
