//! Postprocess Chain
//!
//! Records the full image chain at the end of the post-opaque stage:
//!
//! ```text
//!  G-buffer color ──► [clouds] ─► [TAA]* ─► [DoF] ─► [motion blur] ─► [bloom]     (HDR ping-pong)
//!                                                                        │
//!                                                                        ▼
//!                                                                     tonemap      (mandatory)
//!                                                                        │
//!                                             LDR0 ─► [sharpen] ─► [FXAA] ─► [chromatic aberration]
//!                                                                        │
//!                                                   downsample 4x ─► downsample 4x ─► gaussian blur
//! ```
//!
//! Bracketed steps are gated by their settings and are no-ops when disabled:
//! the handle they would have read becomes the next step's input unchanged.
//! `*` TAA writes into its own frame-parity pair and hands the result to the
//! next step through a [`ChainInput::Override`] instead of swapping roles.
//!
//! The same settings and inputs always produce the same step sequence.

pub mod chain;
mod hdr;
mod ldr;
mod tonemap;

use smallvec::SmallVec;

use crate::device::{CommandList, PassKind, TextureHandle};
use crate::resources::{PlaceholderTextures, RenderTargetSet, TargetId};
use crate::rotation::FrameParityPair;
use crate::settings::RenderPathSettings;

pub use chain::{ChainInput, PostprocessChain};

/// Everything the chain reads besides the command list.
#[derive(Debug, Clone, Copy)]
pub struct ChainContext<'a> {
    pub settings: &'a RenderPathSettings,
    pub targets: &'a RenderTargetSet,
    pub placeholders: &'a PlaceholderTextures,
    pub temporal_aa: FrameParityPair,
    pub color_grading_lut: Option<TextureHandle>,
    /// Device frame counter. Picks the temporal AA output and history.
    pub frame_counter: u64,
}

/// Outcome of one chain recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSummary {
    /// Final limited-range image handed to the compositor.
    pub output: TextureHandle,
    /// Blurred background consumed by UI compositing.
    pub blurred_background: TextureHandle,
    /// Recorded passes in execution order.
    pub executed: SmallVec<[PassKind; 16]>,
}

/// Records the whole chain into `list`.
pub fn record_postprocess(ctx: &ChainContext<'_>, list: &mut CommandList) -> ChainSummary {
    let targets = ctx.targets;
    let mut chain = PostprocessChain::new(
        targets.read(TargetId::GbufferColor),
        targets.handle(TargetId::PostprocessHdr),
    );

    list.push_debug_group("Postprocess HDR");
    hdr::volumetric_clouds(ctx, &mut chain, list);
    hdr::temporal_aa(ctx, &mut chain, list);
    hdr::depth_of_field(ctx, &mut chain, list);
    hdr::motion_blur(ctx, &mut chain, list);
    hdr::bloom(ctx, &mut chain, list);
    list.pop_debug_group();

    list.push_debug_group("Tonemap");
    tonemap::tonemap(ctx, &mut chain, list);
    list.pop_debug_group();

    list.push_debug_group("Postprocess LDR");
    ldr::sharpen(ctx, &mut chain, list);
    ldr::fxaa(ctx, &mut chain, list);
    ldr::chromatic_aberration(ctx, &mut chain, list);
    let output = chain.take_input();
    list.pop_debug_group();

    list.push_debug_group("Blurred Background");
    let blurred_background = ldr::blurred_background(ctx, &mut chain, output, list);
    list.pop_debug_group();

    let executed = chain.into_executed();
    log::debug!("Postprocess chain: {executed:?}");

    ChainSummary {
        output,
        blurred_background,
        executed,
    }
}
