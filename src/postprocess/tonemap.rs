//! Tonemap
//!
//! The only mandatory step of the chain. Maps the HDR result into the first
//! limited-range buffer and switches the chain over to the LDR pair.
//!
//! | Input | Source |
//! |-------|--------|
//! | color | chain input (pending override included) |
//! | luminance | `ComputeLuminance` over the G-buffer color when eye adaptation is on, neutral gray otherwise |
//! | distortion | particle distortion, resolved twin under MSAA |
//! | color grade | user lookup when grading is on and one is set, identity strip otherwise |

use super::{ChainContext, PostprocessChain};
use crate::device::{CommandList, PassInvocation, PassKind, TextureHandle};
use crate::resources::TargetId;

pub(super) fn tonemap(ctx: &ChainContext<'_>, chain: &mut PostprocessChain, list: &mut CommandList) {
    let settings = ctx.settings;
    let targets = ctx.targets;

    let input = chain.take_input();
    let luminance = if settings.eye_adaptation {
        let luminance = targets.handle(TargetId::Luminance);
        chain.record(
            list,
            PassInvocation::new(PassKind::ComputeLuminance)
                .input(targets.read(TargetId::GbufferColor))
                .output(luminance),
        );
        luminance
    } else {
        ctx.placeholders.neutral_gray
    };

    let ldr0 = targets.handle(TargetId::PostprocessLdr0);
    let ldr1 = targets.handle(TargetId::PostprocessLdr1);

    chain.record(
        list,
        PassInvocation::new(PassKind::Tonemap)
            .input(input)
            .input(luminance)
            .input(targets.read(TargetId::ParticleDistortion))
            .input(color_grade(ctx))
            .output(ldr0)
            .params(&[settings.exposure, if settings.dither { 1.0 } else { 0.0 }]),
    );

    chain.rebind(ldr0, ldr1);
}

fn color_grade(ctx: &ChainContext<'_>) -> TextureHandle {
    match ctx.color_grading_lut {
        Some(lut) if ctx.settings.color_grading => lut,
        _ => ctx.placeholders.identity_color_grade,
    }
}
