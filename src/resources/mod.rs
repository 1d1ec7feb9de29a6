//! Render Path Resources
//!
//! Resolution-dependent resource descriptions and the tables built from them.
//!
//! # Resource Categories
//!
//! | Type | Lifetime | Rebuilt |
//! |------|----------|---------|
//! | [`RenderTargetSet`] | Between resizes | Wholesale on every resize |
//! | [`RenderPassTable`] | Between resizes | Alongside the target set |
//! | [`PlaceholderTextures`] | Render path lifetime | Never |
//!
//! Descriptors are pure data derived from [`Resolution`], the MSAA sample
//! count and device capabilities; allocation happens in the
//! [`provisioner`](crate::provisioner).

pub mod placeholder;
pub mod render_pass;
pub mod targets;

use crate::device::ResourceLayout;
use crate::errors::{RenderPathError, Result};

pub use placeholder::PlaceholderTextures;
pub use render_pass::{
    Attachment, AttachmentKind, LoadOp, RenderPassDesc, RenderPassId, RenderPassTable, StoreOp,
};
pub use targets::{RenderTarget, RenderTargetSet, TargetId};

/// Internal render resolution. Immutable during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderPathError::InvalidResolution { width, height });
        }
        Ok(Self { width, height })
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Extent divided by an integer factor, never collapsing below 1×1.
    #[inline]
    #[must_use]
    pub fn divided(&self, divisor: u32) -> (u32, u32) {
        ((self.width / divisor).max(1), (self.height / divisor).max(1))
    }

    /// Extent rounded up to whole tiles of `tile` pixels.
    #[inline]
    #[must_use]
    pub fn tiles(&self, tile: u32) -> (u32, u32) {
        (self.width.div_ceil(tile), self.height.div_ceil(tile))
    }
}

/// Number of mip levels for a progressively downsampled resource:
/// `min(cap, floor(log2(max(w, h))) + 1)`.
#[inline]
#[must_use]
pub fn mip_level_count(width: u32, height: u32, cap: u32) -> u32 {
    let largest = width.max(height).max(1);
    let full_chain = u32::BITS - largest.leading_zeros();
    full_chain.min(cap.max(1))
}

/// Initial texel contents of a created texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureContents {
    #[default]
    Uninitialized,
    /// Every texel set to one RGBA8 value.
    Solid([u8; 4]),
    /// Identity color-grading strip (16 slices of 16×16 laid out horizontally).
    IdentityColorGrade,
}

/// Complete description of one texture allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    pub sample_count: u32,
    pub mip_level_count: u32,
    /// Progressively downsampled target. Gets one view per level, even when
    /// the extent only allows level 0.
    pub mip_chained: bool,
    /// Layout the resource rests in between stages.
    pub layout: ResourceLayout,
    pub contents: TextureContents,
}

impl ResourceDescriptor {
    #[must_use]
    pub fn new(
        label: &'static str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        Self {
            label,
            width,
            height,
            format,
            usage,
            sample_count: 1,
            mip_level_count: 1,
            mip_chained: false,
            layout: ResourceLayout::ShaderResource,
            contents: TextureContents::Uninitialized,
        }
    }

    #[must_use]
    pub fn samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    #[must_use]
    pub fn mips(mut self, mip_level_count: u32) -> Self {
        self.mip_level_count = mip_level_count;
        self.mip_chained = true;
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: ResourceLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn contents(mut self, contents: TextureContents) -> Self {
        self.contents = contents;
        self
    }

    #[inline]
    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_matches_log2_formula() {
        assert_eq!(mip_level_count(1, 1, 8), 1);
        assert_eq!(mip_level_count(2, 1, 8), 2);
        assert_eq!(mip_level_count(960, 540, 8), 8);
        assert_eq!(mip_level_count(960, 540, 16), 10);
        assert_eq!(mip_level_count(1024, 16, 16), 11);
        assert_eq!(mip_level_count(1023, 16, 16), 10);
    }

    #[test]
    fn mip_count_never_zero() {
        assert_eq!(mip_level_count(0, 0, 0), 1);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        assert!(Resolution::new(0, 720).is_err());
        assert!(Resolution::new(1280, 0).is_err());
        assert!(Resolution::new(1, 1).is_ok());
    }

    #[test]
    fn divided_extent_is_clamped() {
        let res = Resolution::new(1920, 2).unwrap();
        assert_eq!(res.divided(4), (480, 1));
        assert_eq!(res.tiles(16), (120, 1));
    }
}
