//! Headless Device
//!
//! A [`GraphicsDevice`] that allocates nothing on a GPU. Every texture,
//! subresource view and submitted batch is recorded so callers can inspect
//! exactly what the render path asked for. Used by the test suite and by
//! offline tooling that only needs the frame schedule.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use slotmap::SlotMap;

use super::{CapabilityFlags, DeviceCapabilities, GraphicsDevice, SubresourceKind, TextureHandle};
use crate::device::CommandList;
use crate::errors::{RenderPathError, Result};
use crate::resources::ResourceDescriptor;

/// Bookkeeping for one live headless texture.
#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    pub desc: ResourceDescriptor,
    /// Mip level of each sampled view, indexed by view index.
    pub sampled_views: Vec<u32>,
    /// Mip level of each storage view, indexed by view index.
    pub storage_views: Vec<u32>,
}

#[derive(Default)]
struct State {
    textures: SlotMap<TextureHandle, HeadlessTexture>,
    submitted: Vec<Vec<CommandList>>,
    /// Labels whose creation is forced to fail.
    failing_labels: Vec<&'static str>,
    /// Offset added to every returned view index (simulates a broken backend).
    view_index_skew: u32,
    fail_next_submit: bool,
    created_total: usize,
}

pub struct HeadlessDevice {
    capabilities: DeviceCapabilities,
    display_format: wgpu::TextureFormat,
    state: Mutex<State>,
    next_sequence: AtomicU64,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(DeviceCapabilities::default())
    }
}

impl HeadlessDevice {
    #[must_use]
    pub fn new(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            display_format: wgpu::TextureFormat::Rgba8Unorm,
            state: Mutex::new(State::default()),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Device reporting every optional capability and sample counts 1..=8.
    #[must_use]
    pub fn full_featured() -> Self {
        Self::new(DeviceCapabilities {
            flags: CapabilityFlags::all(),
            sample_counts: smallvec::smallvec![1, 2, 4, 8],
            ..DeviceCapabilities::default()
        })
    }

    #[must_use]
    pub fn with_display_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.display_format = format;
        self
    }

    /// Makes every subsequent creation of a texture labelled `label` fail.
    pub fn fail_texture(&self, label: &'static str) {
        self.state.lock().failing_labels.push(label);
    }

    /// Skews returned subresource indices by `skew`.
    pub fn skew_view_indices(&self, skew: u32) {
        self.state.lock().view_index_skew = skew;
    }

    /// Rejects the next submitted batch.
    pub fn fail_next_submit(&self) {
        self.state.lock().fail_next_submit = true;
    }

    #[must_use]
    pub fn live_texture_count(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Number of textures ever created, released ones included.
    #[must_use]
    pub fn created_texture_count(&self) -> usize {
        self.state.lock().created_total
    }

    #[must_use]
    pub fn texture(&self, handle: TextureHandle) -> Option<HeadlessTexture> {
        self.state.lock().textures.get(handle).cloned()
    }

    #[must_use]
    pub fn is_live(&self, handle: TextureHandle) -> bool {
        self.state.lock().textures.contains_key(handle)
    }

    /// Every batch submitted so far, oldest first.
    #[must_use]
    pub fn submitted_batches(&self) -> Vec<Vec<CommandList>> {
        self.state.lock().submitted.clone()
    }

    #[must_use]
    pub fn last_batch(&self) -> Option<Vec<CommandList>> {
        self.state.lock().submitted.last().cloned()
    }

    fn validate(&self, desc: &ResourceDescriptor) -> std::result::Result<(), String> {
        if desc.width == 0 || desc.height == 0 {
            return Err(format!("zero extent {}x{}", desc.width, desc.height));
        }
        if !self.capabilities.supports_sample_count(desc.sample_count) {
            return Err(format!("sample count {} unsupported", desc.sample_count));
        }
        if desc.mip_level_count == 0 {
            return Err("zero mip levels".to_owned());
        }
        let storage = desc.usage.contains(wgpu::TextureUsages::STORAGE_BINDING);
        if desc.format.is_depth_stencil_format() && storage {
            return Err(format!("{:?} cannot be bound as storage", desc.format));
        }
        if desc.is_multisampled() && (storage || desc.mip_level_count > 1) {
            return Err("multisampled textures cannot carry storage usage or mips".to_owned());
        }
        Ok(())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn display_format(&self) -> wgpu::TextureFormat {
        self.display_format
    }

    fn create_texture(&self, desc: &ResourceDescriptor) -> Result<TextureHandle> {
        let mut state = self.state.lock();
        if state.failing_labels.contains(&desc.label) {
            return Err(RenderPathError::ResourceCreation {
                label: desc.label,
                reason: "creation failure injected".to_owned(),
            });
        }
        self.validate(desc)
            .map_err(|reason| RenderPathError::ResourceCreation {
                label: desc.label,
                reason,
            })?;

        state.created_total += 1;
        Ok(state.textures.insert(HeadlessTexture {
            desc: desc.clone(),
            sampled_views: Vec::new(),
            storage_views: Vec::new(),
        }))
    }

    fn create_subresource(
        &self,
        texture: TextureHandle,
        kind: SubresourceKind,
        mip_level: u32,
    ) -> Result<u32> {
        let mut state = self.state.lock();
        let skew = state.view_index_skew;
        let entry = state
            .textures
            .get_mut(texture)
            .ok_or(RenderPathError::UnknownTexture(texture))?;

        if mip_level >= entry.desc.mip_level_count {
            return Err(RenderPathError::ResourceCreation {
                label: entry.desc.label,
                reason: format!(
                    "mip {mip_level} out of range ({} levels)",
                    entry.desc.mip_level_count
                ),
            });
        }

        let views = match kind {
            SubresourceKind::Sampled => &mut entry.sampled_views,
            SubresourceKind::Storage => &mut entry.storage_views,
        };
        views.push(mip_level);
        Ok(views.len() as u32 - 1 + skew)
    }

    fn release_texture(&self, texture: TextureHandle) {
        if self.state.lock().textures.remove(texture).is_none() {
            log::warn!("Released unknown texture {texture:?}");
        }
    }

    fn begin_command_list(&self, label: &'static str) -> CommandList {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        CommandList::new(sequence, label)
    }

    fn submit(&self, lists: Vec<CommandList>) -> Result<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_submit) {
            return Err(RenderPathError::Submission("submit failure injected".to_owned()));
        }
        debug_assert!(
            lists.windows(2).all(|w| w[0].sequence() < w[1].sequence()),
            "batch not sorted by open sequence"
        );
        for list in &lists {
            for texture in referenced_textures(list) {
                if !state.textures.contains_key(texture) {
                    return Err(RenderPathError::UnknownTexture(texture));
                }
            }
        }
        state.submitted.push(lists);
        Ok(())
    }

    fn frame_count(&self) -> u64 {
        self.state.lock().submitted.len() as u64
    }
}

fn referenced_textures(list: &CommandList) -> impl Iterator<Item = TextureHandle> + '_ {
    use crate::device::Command;

    list.commands().iter().flat_map(|command| {
        let handles: smallvec::SmallVec<[TextureHandle; 8]> = match command {
            Command::BeginRenderPass(desc) => desc.attachments.iter().map(|a| a.texture).collect(),
            Command::Barrier(barriers) => barriers.iter().map(|b| b.texture).collect(),
            Command::Copy { src, dst } => smallvec::smallvec![*src, *dst],
            Command::BindTexture {
                texture: Some(t), ..
            }
            | Command::BindShadingRateImage(Some(t)) => smallvec::smallvec![*t],
            Command::Pass(pass) => pass.inputs.iter().chain(&pass.outputs).copied().collect(),
            _ => smallvec::SmallVec::new(),
        };
        handles
    })
}
