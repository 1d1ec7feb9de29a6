//! Neutral placeholder textures bound in place of disabled stage outputs.
//!
//! | Placeholder | Substitutes |
//! |-------------|-------------|
//! | `white` | ambient occlusion |
//! | `transparent` | planar reflection, SSR / RT reflection |
//! | `neutral_gray` | scene luminance when eye adaptation is off |
//! | `identity_color_grade` | color grading lookup when grading is off or unset |

use crate::device::{GraphicsDevice, TextureHandle};
use crate::errors::Result;
use crate::resources::{ResourceDescriptor, TextureContents};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderTextures {
    pub white: TextureHandle,
    pub transparent: TextureHandle,
    pub neutral_gray: TextureHandle,
    pub identity_color_grade: TextureHandle,
}

impl PlaceholderTextures {
    pub fn create(device: &dyn GraphicsDevice) -> Result<Self> {
        let solid = |label, rgba| {
            device.create_texture(
                &ResourceDescriptor::new(
                    label,
                    (1, 1),
                    wgpu::TextureFormat::Rgba8Unorm,
                    wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                )
                .contents(TextureContents::Solid(rgba)),
            )
        };

        let white = solid("placeholder.white", [255, 255, 255, 255])?;
        let transparent = solid("placeholder.transparent", [0, 0, 0, 0])?;
        let neutral_gray = solid("placeholder.gray", [128, 128, 128, 255])?;
        let identity_color_grade = device.create_texture(
            &ResourceDescriptor::new(
                "placeholder.color_grade",
                (256, 16),
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            )
            .contents(TextureContents::IdentityColorGrade),
        )?;

        Ok(Self {
            white,
            transparent,
            neutral_gray,
            identity_color_grade,
        })
    }

    pub fn release(&self, device: &dyn GraphicsDevice) {
        for texture in [
            self.white,
            self.transparent,
            self.neutral_gray,
            self.identity_color_grade,
        ] {
            device.release_texture(texture);
        }
    }
}

/// RGBA8 texels of the identity color-grading strip.
#[must_use]
pub fn identity_color_grade_texels() -> Vec<u8> {
    let mut texels = Vec::with_capacity(256 * 16 * 4);
    for y in 0..16u32 {
        for x in 0..256u32 {
            let r = (x % 16) * 255 / 15;
            let g = y * 255 / 15;
            let b = (x / 16) * 255 / 15;
            texels.extend_from_slice(&[r as u8, g as u8, b as u8, 255]);
        }
    }
    texels
}
