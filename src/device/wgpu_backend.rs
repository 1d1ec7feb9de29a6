//! wgpu Backend
//!
//! Maps the render path's device interface onto `wgpu`:
//!
//! - Textures become `wgpu::Texture`s with a default view plus per-mip views
//!   created on demand through [`GraphicsDevice::create_subresource`].
//! - Each [`CommandList`] is replayed into its own `wgpu::CommandEncoder`;
//!   all encoders of a frame are submitted in one `Queue::submit` call, in
//!   list-open order.
//! - Layout barriers are implicit in wgpu and therefore skipped at replay.
//! - Opaque [`PassInvocation`]s are forwarded to the [`PassRecorder`]
//!   registered for their kind, or become debug markers when none is.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::{
    Command, CommandList, DeviceCapabilities, GraphicsDevice, PassInvocation, PassKind,
    ResourceLayout, SubresourceKind, TextureHandle,
};
use crate::errors::{RenderPathError, Result};
use crate::resources::placeholder::identity_color_grade_texels;
use crate::resources::{
    AttachmentKind, LoadOp, RenderPassDesc, ResourceDescriptor, StoreOp, TextureContents,
};

/// GPU-side storage of one texture.
pub struct WgpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampled_views: Vec<wgpu::TextureView>,
    pub storage_views: Vec<wgpu::TextureView>,
    pub desc: ResourceDescriptor,
}

/// Read access to live textures while a pass is being encoded.
pub struct TextureLookup<'a> {
    textures: &'a SlotMap<TextureHandle, WgpuTexture>,
}

impl TextureLookup<'_> {
    #[must_use]
    pub fn get(&self, handle: TextureHandle) -> Option<&WgpuTexture> {
        self.textures.get(handle)
    }
}

/// Encodes the GPU work behind one [`PassKind`].
pub trait PassRecorder: Send + Sync {
    /// Work recorded outside any render pass (compute, copies, fullscreen
    /// passes the recorder begins itself).
    fn encode(
        &self,
        pass: &PassInvocation,
        textures: &TextureLookup<'_>,
        encoder: &mut wgpu::CommandEncoder,
    );

    /// Draws recorded inside a render pass begun by the render path.
    fn draw(
        &self,
        _pass: &PassInvocation,
        _textures: &TextureLookup<'_>,
        _render_pass: &mut wgpu::RenderPass<'_>,
    ) {
    }
}

pub struct WgpuDevice {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    capabilities: DeviceCapabilities,
    display_format: wgpu::TextureFormat,
    textures: Mutex<SlotMap<TextureHandle, WgpuTexture>>,
    recorders: RwLock<FxHashMap<PassKind, Arc<dyn PassRecorder>>>,
    next_sequence: AtomicU64,
    submitted: AtomicU64,
}

impl WgpuDevice {
    /// Wraps an already-requested device. Sample-count support is queried
    /// from the adapter for the HDR scene format.
    #[must_use]
    pub fn new(
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        display_format: wgpu::TextureFormat,
    ) -> Self {
        let features = adapter.get_texture_format_features(wgpu::TextureFormat::Rgba16Float);
        let sample_counts: SmallVec<[u32; 5]> = [1, 2, 4, 8, 16]
            .into_iter()
            .filter(|&count| features.flags.sample_count_supported(count))
            .collect();

        // Image-based VRS and ray queries are not exposed through this backend.
        let capabilities = DeviceCapabilities {
            sample_counts,
            ..DeviceCapabilities::default()
        };

        log::info!(
            "wgpu render path device: {:?}, MSAA counts {:?}",
            adapter.get_info().name,
            capabilities.sample_counts
        );

        Self {
            adapter,
            device,
            queue,
            capabilities,
            display_format,
            textures: Mutex::new(SlotMap::with_key()),
            recorders: RwLock::new(FxHashMap::default()),
            next_sequence: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Registers the encoder for a pass kind, replacing any previous one.
    pub fn register_recorder(&self, kind: PassKind, recorder: Arc<dyn PassRecorder>) {
        self.recorders.write().insert(kind, recorder);
    }

    /// Runs `f` with the wgpu texture behind `handle`.
    pub fn with_texture<R>(&self, handle: TextureHandle, f: impl FnOnce(&WgpuTexture) -> R) -> Option<R> {
        self.textures.lock().get(handle).map(f)
    }

    fn upload_contents(&self, texture: &wgpu::Texture, desc: &ResourceDescriptor) {
        let texels = match desc.contents {
            TextureContents::Uninitialized => return,
            TextureContents::Solid(rgba) => rgba.repeat((desc.width * desc.height) as usize),
            TextureContents::IdentityColorGrade => identity_color_grade_texels(),
        };
        if desc.format != wgpu::TextureFormat::Rgba8Unorm {
            log::warn!("Skipping initial contents of '{}': format {:?} is not RGBA8", desc.label, desc.format);
            return;
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * 4),
                rows_per_image: Some(desc.height),
            },
            extent(desc),
        );
    }

    fn encode_list(
        &self,
        textures: &SlotMap<TextureHandle, WgpuTexture>,
        recorders: &FxHashMap<PassKind, Arc<dyn PassRecorder>>,
        list: &CommandList,
    ) -> Result<wgpu::CommandBuffer> {
        let lookup = TextureLookup { textures };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(list.label()),
            });

        let mut commands = list.commands().iter();
        while let Some(command) = commands.next() {
            match command {
                Command::PushDebugGroup(label) => encoder.push_debug_group(label),
                Command::PopDebugGroup => encoder.pop_debug_group(),
                Command::BeginRenderPass(desc) => {
                    let mut render_pass = begin_render_pass(&mut encoder, textures, desc)?;
                    for inner in commands.by_ref() {
                        match inner {
                            Command::EndRenderPass => break,
                            Command::PushDebugGroup(label) => render_pass.push_debug_group(label),
                            Command::PopDebugGroup => render_pass.pop_debug_group(),
                            Command::Pass(invocation) => match recorders.get(&invocation.kind) {
                                Some(recorder) => recorder.draw(invocation, &lookup, &mut render_pass),
                                None => render_pass.insert_debug_marker(invocation.kind.name()),
                            },
                            _ => {}
                        }
                    }
                }
                Command::Copy { src, dst } => {
                    let src = textures.get(*src).ok_or(RenderPathError::UnknownTexture(*src))?;
                    let dst = textures.get(*dst).ok_or(RenderPathError::UnknownTexture(*dst))?;
                    encoder.copy_texture_to_texture(
                        wgpu::TexelCopyTextureInfo {
                            texture: &src.texture,
                            mip_level: 0,
                            origin: wgpu::Origin3d::ZERO,
                            aspect: wgpu::TextureAspect::All,
                        },
                        wgpu::TexelCopyTextureInfo {
                            texture: &dst.texture,
                            mip_level: 0,
                            origin: wgpu::Origin3d::ZERO,
                            aspect: wgpu::TextureAspect::All,
                        },
                        extent(&src.desc),
                    );
                }
                Command::Pass(invocation) => match recorders.get(&invocation.kind) {
                    Some(recorder) => recorder.encode(invocation, &lookup, &mut encoder),
                    None => encoder.insert_debug_marker(invocation.kind.name()),
                },
                // Transitions and bindings are tracked by wgpu itself.
                Command::Barrier(_)
                | Command::BindTexture { .. }
                | Command::BindShadingRateImage(_)
                | Command::EndRenderPass => {}
            }
        }

        Ok(encoder.finish())
    }
}

fn extent(desc: &ResourceDescriptor) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: desc.width,
        height: desc.height,
        depth_or_array_layers: 1,
    }
}

fn load_op<V>(op: LoadOp, clear: V) -> wgpu::LoadOp<V> {
    match op {
        LoadOp::Load => wgpu::LoadOp::Load,
        LoadOp::Clear => wgpu::LoadOp::Clear(clear),
        LoadOp::DontCare => wgpu::LoadOp::DontCare(wgpu::LoadOpDontCare::default()),
    }
}

fn store_op(op: StoreOp) -> wgpu::StoreOp {
    match op {
        StoreOp::Store => wgpu::StoreOp::Store,
        StoreOp::DontCare => wgpu::StoreOp::Discard,
    }
}

fn begin_render_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    textures: &SlotMap<TextureHandle, WgpuTexture>,
    desc: &RenderPassDesc,
) -> Result<wgpu::RenderPass<'e>> {
    let view = |handle: TextureHandle| {
        textures
            .get(handle)
            .map(|t| &t.view)
            .ok_or(RenderPathError::UnknownTexture(handle))
    };

    let mut resolves = desc.resolves();
    let mut color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment<'_>>; 4]> =
        SmallVec::new();
    let mut depth_stencil_attachment = None;

    for attachment in &desc.attachments {
        match attachment.kind {
            AttachmentKind::RenderTarget => {
                let resolve_target = match resolves.next() {
                    Some(resolve) => Some(view(resolve.texture)?),
                    None => None,
                };
                color_attachments.push(Some(wgpu::RenderPassColorAttachment {
                    view: view(attachment.texture)?,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: load_op(attachment.load, wgpu::Color::TRANSPARENT),
                        store: store_op(attachment.store),
                    },
                    depth_slice: None,
                }));
            }
            AttachmentKind::DepthStencil => {
                let read_only = attachment.subpass_layout == ResourceLayout::DepthStencilReadOnly;
                depth_stencil_attachment = Some(wgpu::RenderPassDepthStencilAttachment {
                    view: view(attachment.texture)?,
                    // Reverse Z: clear to the far plane.
                    depth_ops: (!read_only).then(|| wgpu::Operations {
                        load: load_op(attachment.load, 0.0),
                        store: store_op(attachment.store),
                    }),
                    stencil_ops: None,
                });
            }
            AttachmentKind::Resolve => {}
        }
    }

    Ok(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(desc.label),
        color_attachments: &color_attachments,
        depth_stencil_attachment,
        ..Default::default()
    }))
}

impl GraphicsDevice for WgpuDevice {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn display_format(&self) -> wgpu::TextureFormat {
        self.display_format
    }

    fn create_texture(&self, desc: &ResourceDescriptor) -> Result<TextureHandle> {
        let features = self.adapter.get_texture_format_features(desc.format);
        let failure = |reason: String| RenderPathError::ResourceCreation {
            label: desc.label,
            reason,
        };
        if !features.allowed_usages.contains(desc.usage) {
            return Err(failure(format!(
                "{:?} does not allow usage {:?}",
                desc.format, desc.usage
            )));
        }
        if !features.flags.sample_count_supported(desc.sample_count) {
            return Err(failure(format!(
                "{:?} does not support {}x MSAA",
                desc.format, desc.sample_count
            )));
        }
        if desc.is_multisampled() && desc.mip_level_count > 1 {
            return Err(failure("multisampled textures cannot have mips".to_owned()));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: extent(desc),
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.upload_contents(&texture, desc);

        Ok(self.textures.lock().insert(WgpuTexture {
            texture,
            view,
            sampled_views: Vec::new(),
            storage_views: Vec::new(),
            desc: desc.clone(),
        }))
    }

    fn create_subresource(
        &self,
        texture: TextureHandle,
        kind: SubresourceKind,
        mip_level: u32,
    ) -> Result<u32> {
        let mut textures = self.textures.lock();
        let entry = textures
            .get_mut(texture)
            .ok_or(RenderPathError::UnknownTexture(texture))?;
        if mip_level >= entry.desc.mip_level_count {
            return Err(RenderPathError::ResourceCreation {
                label: entry.desc.label,
                reason: format!("mip {mip_level} out of range"),
            });
        }

        let view = entry.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(entry.desc.label),
            base_mip_level: mip_level,
            mip_level_count: Some(1),
            ..Default::default()
        });
        let views = match kind {
            SubresourceKind::Sampled => &mut entry.sampled_views,
            SubresourceKind::Storage => &mut entry.storage_views,
        };
        views.push(view);
        Ok(views.len() as u32 - 1)
    }

    fn release_texture(&self, texture: TextureHandle) {
        if let Some(entry) = self.textures.lock().remove(texture) {
            entry.texture.destroy();
        }
    }

    fn begin_command_list(&self, label: &'static str) -> CommandList {
        CommandList::new(self.next_sequence.fetch_add(1, Ordering::Relaxed), label)
    }

    fn submit(&self, lists: Vec<CommandList>) -> Result<()> {
        let textures = self.textures.lock();
        let recorders = self.recorders.read();
        let buffers = lists
            .iter()
            .map(|list| self.encode_list(&textures, &recorders, list))
            .collect::<Result<Vec<_>>>()?;

        self.queue.submit(buffers);
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn frame_count(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}
