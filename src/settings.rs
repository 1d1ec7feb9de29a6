//! Render Path Settings
//!
//! This module defines the feature switches and tuning parameters consumed by
//! the render path each frame.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_renderpath::settings::{AoMode, RenderPathSettings};
//!
//! let mut settings = RenderPathSettings::default();
//! settings.ambient_occlusion.mode = AoMode::Hbao;
//! settings.bloom.enabled = true;
//! settings.msaa_samples = 4;
//!
//! // Or from a JSON preset:
//! let settings = RenderPathSettings::from_json_str(r#"{ "temporal_aa": true }"#)?;
//! ```
//!
//! # Option Overview
//!
//! | Option | Effect |
//! |--------|--------|
//! | `ambient_occlusion.mode` | off / SSAO / HBAO / MSAO / RTAO |
//! | `shadows` / `raytraced_shadows` | gate the shadow-map stage |
//! | `ssr` / `raytraced_reflections` | select the screen-space reflection path |
//! | `bloom` | gates the bloom step, sets its luminance cutoff |
//! | `depth_of_field` / `motion_blur` | gate the respective HDR steps |
//! | `temporal_aa` | history-based resolve; camera jitter off when disabled |
//! | `fxaa` / `sharpen` / `chromatic_aberration` | gate the LDR steps |
//! | `volumetric_clouds` / `volumetric_lights` / `light_shafts` / `lens_flare` | gate post-opaque sub-stages |
//! | `outline` | selection outline overlay |
//! | `color_grading` / `eye_adaptation` / `exposure` / `dither` | tonemap inputs |
//! | `msaa_samples` | governs resolved-twin provisioning |

use serde::{Deserialize, Serialize};

use crate::errors::Result;

// ---------------------------------------------------------------------------
// Ambient Occlusion
// ---------------------------------------------------------------------------

/// Ambient occlusion technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AoMode {
    /// No ambient occlusion; consumers bind the white placeholder.
    #[default]
    Disabled,
    /// Screen-space ambient occlusion.
    Ssao,
    /// Horizon-based ambient occlusion.
    Hbao,
    /// Multi-scale ambient occlusion.
    Msao,
    /// Ray-traced ambient occlusion (requires ray-tracing support).
    Rtao,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientOcclusionSettings {
    pub mode: AoMode,
    /// World-space sampling radius (SSAO / RTAO).
    pub range: f32,
    /// Samples per pixel (SSAO / RTAO).
    pub sample_count: u32,
    pub power: f32,
}

impl Default for AmbientOcclusionSettings {
    fn default() -> Self {
        Self {
            mode: AoMode::Disabled,
            range: 1.0,
            sample_count: 16,
            power: 2.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Postprocess effects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Luminance cutoff above which pixels contribute to bloom.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthOfFieldSettings {
    pub enabled: bool,
    pub focus: f32,
    pub strength: f32,
    pub aspect: f32,
}

impl Default for DepthOfFieldSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            focus: 2.5,
            strength: 10.0,
            aspect: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionBlurSettings {
    pub enabled: bool,
    pub strength: f32,
}

impl Default for MotionBlurSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 100.0,
        }
    }
}

/// Toggle with a single scalar amount (sharpen, chromatic aberration).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountSettings {
    pub enabled: bool,
    pub amount: f32,
}

impl Default for AmountSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            amount: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineSettings {
    pub enabled: bool,
    pub threshold: f32,
    pub thickness: f32,
    /// Linear RGBA.
    pub color: [f32; 4],
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.2,
            thickness: 1.0,
            color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

// ---------------------------------------------------------------------------
// RenderPathSettings
// ---------------------------------------------------------------------------

/// Feature switches and parameters of the 3D render path.
///
/// Read by every stage of a frame through an immutable snapshot; changes made
/// between frames take effect on the next [`RenderPath3D::render`] call.
/// `msaa_samples` is the exception: it sizes provisioned resources and only
/// takes effect on the next resize.
///
/// [`RenderPath3D::render`]: crate::render_path::RenderPath3D::render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPathSettings {
    // === Geometry stages ===
    pub ambient_occlusion: AmbientOcclusionSettings,
    pub shadows: bool,
    /// Replaces shadow maps entirely when ray tracing is supported.
    pub raytraced_shadows: bool,
    /// Voxel radiance global illumination.
    pub voxel_gi: bool,
    /// Planar reflections.
    pub reflections: bool,
    pub ssr: bool,
    pub raytraced_reflections: bool,
    /// Variable-rate shading classification (VRS tier 2 only).
    pub variable_rate_shading: bool,
    pub outline: OutlineSettings,

    // === Post-opaque stages ===
    pub volumetric_clouds: bool,
    pub volumetric_lights: bool,
    pub light_shafts: bool,
    pub lens_flare: bool,

    // === HDR chain ===
    pub temporal_aa: bool,
    pub depth_of_field: DepthOfFieldSettings,
    pub motion_blur: MotionBlurSettings,
    pub bloom: BloomSettings,

    // === Tonemap ===
    pub exposure: f32,
    pub eye_adaptation: bool,
    pub color_grading: bool,
    pub dither: bool,

    // === LDR chain ===
    pub sharpen: AmountSettings,
    pub fxaa: bool,
    pub chromatic_aberration: AmountSettings,

    // === Resources ===
    /// MSAA sample count. Common values: 1 (off), 2, 4, 8.
    pub msaa_samples: u32,

    // === Debug ===
    pub debug_light_culling: bool,
    pub debug_shading_rate: bool,
    /// Visibility layer mask forwarded to the scene's visibility queries.
    pub layer_mask: u32,
}

impl Default for RenderPathSettings {
    fn default() -> Self {
        Self {
            ambient_occlusion: AmbientOcclusionSettings::default(),
            shadows: true,
            raytraced_shadows: false,
            voxel_gi: false,
            reflections: true,
            ssr: false,
            raytraced_reflections: false,
            variable_rate_shading: false,
            outline: OutlineSettings::default(),
            volumetric_clouds: false,
            volumetric_lights: true,
            light_shafts: false,
            lens_flare: true,
            temporal_aa: false,
            depth_of_field: DepthOfFieldSettings::default(),
            motion_blur: MotionBlurSettings::default(),
            bloom: BloomSettings::default(),
            exposure: 1.0,
            eye_adaptation: false,
            color_grading: false,
            dither: true,
            sharpen: AmountSettings::default(),
            fxaa: false,
            chromatic_aberration: AmountSettings::default(),
            msaa_samples: 1,
            debug_light_culling: false,
            debug_shading_rate: false,
            layer_mask: u32::MAX,
        }
    }
}

impl RenderPathSettings {
    /// Parses settings from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Settings with every optional stage and postprocess step turned off.
    ///
    /// Only the unconditional stages, the tonemap and the background blur
    /// remain active.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            shadows: false,
            reflections: false,
            volumetric_lights: false,
            lens_flare: false,
            bloom: BloomSettings {
                enabled: false,
                ..BloomSettings::default()
            },
            dither: false,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn ao_enabled(&self) -> bool {
        self.ambient_occlusion.mode != AoMode::Disabled
    }

    /// Returns `true` when any ray-traced feature is requested.
    #[inline]
    #[must_use]
    pub fn wants_raytracing(&self) -> bool {
        self.ambient_occlusion.mode == AoMode::Rtao
            || self.raytraced_shadows
            || self.raytraced_reflections
    }
}
