//! Limited-range steps and the background-blur tail.

use super::{ChainContext, PostprocessChain};
use crate::device::{CommandList, PassInvocation, PassKind, TextureHandle};
use crate::resources::TargetId;

pub(super) fn sharpen(ctx: &ChainContext<'_>, chain: &mut PostprocessChain, list: &mut CommandList) {
    let sharpen = ctx.settings.sharpen;
    if !sharpen.enabled {
        return;
    }
    chain.step(list, |input, output| {
        PassInvocation::new(PassKind::Sharpen)
            .input(input)
            .output(output)
            .param(sharpen.amount)
    });
}

pub(super) fn fxaa(ctx: &ChainContext<'_>, chain: &mut PostprocessChain, list: &mut CommandList) {
    if !ctx.settings.fxaa {
        return;
    }
    chain.step(list, |input, output| {
        PassInvocation::new(PassKind::Fxaa).input(input).output(output)
    });
}

pub(super) fn chromatic_aberration(
    ctx: &ChainContext<'_>,
    chain: &mut PostprocessChain,
    list: &mut CommandList,
) {
    let aberration = ctx.settings.chromatic_aberration;
    if !aberration.enabled {
        return;
    }
    chain.step(list, |input, output| {
        PassInvocation::new(PassKind::ChromaticAberration)
            .input(input)
            .output(output)
            .param(aberration.amount)
    });
}

/// Two 4x downsamples and a separable blur; runs every frame.
pub(super) fn blurred_background(
    ctx: &ChainContext<'_>,
    chain: &mut PostprocessChain,
    source: TextureHandle,
    list: &mut CommandList,
) -> TextureHandle {
    let quarter = ctx.targets.handle(TargetId::BlurredBackground0);
    let tmp = ctx.targets.handle(TargetId::BlurredBackground1);
    let sixteenth = ctx.targets.handle(TargetId::BlurredBackground2);

    chain.record(
        list,
        PassInvocation::new(PassKind::Downsample4x)
            .input(source)
            .output(quarter),
    );
    chain.record(
        list,
        PassInvocation::new(PassKind::Downsample4x)
            .input(quarter)
            .output(sixteenth),
    );
    chain.record(
        list,
        PassInvocation::new(PassKind::GaussianBlur)
            .input(sixteenth)
            .input(tmp)
            .output(sixteenth),
    );
    sixteenth
}
