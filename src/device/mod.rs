//! Graphics Device Interface
//!
//! The render path consumes the device through a deliberately narrow surface:
//! resource creation, per-mip subresource views, recording-context acquisition
//! and ordered batch submission.
//!
//! | Backend | Purpose |
//! |---------|---------|
//! | [`HeadlessDevice`] | Records allocations and submitted batches; no GPU required |
//! | [`WgpuDevice`] | Creates real `wgpu` textures and translates command lists to encoders |
//!
//! Command lists are backend-neutral (see [`command`]). Barriers, copies and
//! opaque pass invocations are recorded once and replayed by the backend in
//! the order the lists were opened.

pub mod command;
pub mod headless;
pub mod wgpu_backend;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::errors::Result;
use crate::resources::ResourceDescriptor;

pub use command::{
    Barrier, BindSlot, Command, CommandList, PassInvocation, PassKind, ResourceLayout,
};
pub use headless::HeadlessDevice;
pub use wgpu_backend::WgpuDevice;

slotmap::new_key_type! {
    /// Handle to a device-owned texture.
    pub struct TextureHandle;
}

bitflags! {
    /// Optional hardware features the render path can take advantage of.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CapabilityFlags: u32 {
        /// Image-based variable-rate shading.
        const VARIABLE_RATE_SHADING_TIER2 = 1 << 0;
        /// Hardware ray tracing (acceleration structures + ray queries).
        const RAYTRACING = 1 << 1;
    }
}

/// Capability report of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub flags: CapabilityFlags,
    /// Render-target sample counts the device accepts, ascending.
    pub sample_counts: SmallVec<[u32; 5]>,
    /// Screen tile edge of the shading-rate image (VRS tier 2 only).
    pub vrs_tile_size: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            flags: CapabilityFlags::empty(),
            sample_counts: SmallVec::from_slice(&[1, 4]),
            vrs_tile_size: 16,
        }
    }
}

impl DeviceCapabilities {
    #[inline]
    #[must_use]
    pub fn supports(&self, flag: CapabilityFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    #[must_use]
    pub fn supports_sample_count(&self, count: u32) -> bool {
        self.sample_counts.contains(&count)
    }
}

/// Kind of single-mip subresource view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubresourceKind {
    /// Read-only sampled view.
    Sampled,
    /// Read-write storage view.
    Storage,
}

/// The device collaborator.
///
/// All methods take `&self`; backends synchronise internally so recording
/// contexts can be acquired from the coordinating thread while workers record.
pub trait GraphicsDevice: Send + Sync {
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Format of the presentable (display-range) surface.
    fn display_format(&self) -> wgpu::TextureFormat;

    fn create_texture(&self, desc: &ResourceDescriptor) -> Result<TextureHandle>;

    /// Creates a single-mip view of `texture` and returns its view index.
    ///
    /// Views of each kind are numbered in creation order starting at 0.
    fn create_subresource(
        &self,
        texture: TextureHandle,
        kind: SubresourceKind,
        mip_level: u32,
    ) -> Result<u32>;

    fn release_texture(&self, texture: TextureHandle);

    /// Opens a recording context. Sequence numbers increase monotonically in
    /// call order and define submission order.
    fn begin_command_list(&self, label: &'static str) -> CommandList;

    /// Submits lists as one ordered batch. Callers pass lists sorted by
    /// sequence number.
    fn submit(&self, lists: Vec<CommandList>) -> Result<()>;

    /// Number of batches submitted so far.
    fn frame_count(&self) -> u64;
}
