#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod device;
pub mod errors;
pub mod graph;
pub mod postprocess;
pub mod provisioner;
pub mod render_path;
pub mod resources;
pub mod rotation;
pub mod scene;
pub mod settings;

pub use device::{CapabilityFlags, DeviceCapabilities, GraphicsDevice, HeadlessDevice, TextureHandle, WgpuDevice};
pub use errors::{RenderPathError, Result, StageError};
pub use graph::{FrameOutcome, StageId, StageNode, StageReport, WorkerPool};
pub use postprocess::{ChainInput, ChainSummary, PostprocessChain};
pub use provisioner::{ProvisionedResources, ResourceProvisioner};
pub use render_path::{FrameInFlight, FrameReport, RenderPath3D};
pub use resources::{RenderTargetSet, Resolution, ResourceDescriptor, TargetId};
pub use rotation::{BufferRotator, BufferSlot, FrameParityPair};
pub use scene::{Camera, FrameState, SceneProvider, VisibilityFlags, VisibilityResult};
pub use settings::{AoMode, RenderPathSettings};
