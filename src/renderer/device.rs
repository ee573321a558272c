use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::renderer::error::DeviceError;
use crate::renderer::image::{
    AccessFlags, DependencyFlags, ImageAspectFlags, ImageDescriptor, ImageFormat, ImageLayout,
    LoadOp, PipelineBindPoint, PipelineStageFlags, SampleCount, SamplerDescriptor, StoreOp,
    TextureDescriptor,
};
use crate::renderer::render_pass::RenderPass;
use crate::renderer::shader_draw::ShaderDraw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageViewId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

/// Sentinel for a dependency endpoint outside the render pass, used only at
/// the device boundary. Blueprints use
/// [`SubpassRef`](crate::renderer::render_pass::SubpassRef) instead.
pub const SUBPASS_EXTERNAL: u32 = u32::MAX;

/// One attachment of a device render-pass descriptor, with every deferred
/// choice (e.g. the swapchain format) already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub format: ImageFormat,
    pub samples: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceInfo {
    pub attachment: u32,
    pub layout: ImageLayout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubpassInfo {
    pub bind_point: PipelineBindPoint,
    pub color: Vec<ReferenceInfo>,
    pub input: Vec<ReferenceInfo>,
    pub resolve: Vec<ReferenceInfo>,
    pub depth_stencil: Option<ReferenceInfo>,
    pub preserve: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage_mask: PipelineStageFlags,
    pub dst_stage_mask: PipelineStageFlags,
    pub src_access_mask: AccessFlags,
    pub dst_access_mask: AccessFlags,
    pub flags: DependencyFlags,
}

/// The fully translated form of a render-pass blueprint, handed to the
/// device. Attachment index `i` here corresponds exactly to attachment `i`
/// of the blueprint it was translated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassDescriptor {
    pub label: String,
    pub attachments: Vec<AttachmentInfo>,
    pub subpasses: Vec<SubpassInfo>,
    pub dependencies: Vec<DependencyInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    pub pass: PassId,
    pub views: Vec<ImageViewId>,
    pub width: u32,
    pub height: u32,
}

/// The abstract GPU capability everything in this crate is written against.
///
/// Creators are fallible and return typed ids; destroyers are infallible and
/// tolerate ids the device no longer knows. All calls are synchronous from
/// the caller's perspective: an implementation may queue GPU work internally
/// but must report success or failure before returning.
///
/// `draw` and `blit_targets` must only be called from the thread that owns
/// the graphics context; that discipline is the frame driver's, not this
/// trait's.
pub trait RenderDevice: Send + Sync {
    fn swap_extent(&self) -> Extent2d;

    /// The concrete format [`ImageFormat::Swapchain`] resolves to.
    fn surface_format(&self) -> ImageFormat;

    fn create_image(&self, desc: &ImageDescriptor) -> Result<ImageId, DeviceError>;
    fn create_image_view(
        &self,
        image: ImageId,
        aspect: ImageAspectFlags,
    ) -> Result<ImageViewId, DeviceError>;
    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<SamplerId, DeviceError>;

    /// Transitions `image` from its current layout to `layout`.
    fn transition_image_layout(
        &self,
        image: ImageId,
        layout: ImageLayout,
        aspect: ImageAspectFlags,
        access: AccessFlags,
    ) -> Result<(), DeviceError>;

    fn create_render_pass(&self, desc: &PassDescriptor) -> Result<PassId, DeviceError>;
    fn create_framebuffer(&self, desc: &FramebufferDescriptor) -> Result<FramebufferId, DeviceError>;

    fn create_mesh(&self, label: &str, vertex_data: &[u8], indices: &[u32])
        -> Result<MeshId, DeviceError>;
    fn create_texture(&self, desc: &TextureDescriptor, pixels: &[u8])
        -> Result<TextureId, DeviceError>;
    fn create_shader(&self, label: &str, source: &str) -> Result<ShaderId, DeviceError>;

    /// Allocates an instance buffer of `size` bytes.
    fn create_instance_buffer(&self, size: u64) -> Result<BufferId, DeviceError>;
    fn write_instance_buffer(&self, buffer: BufferId, data: &[u8]) -> Result<(), DeviceError>;

    fn texture_read_pixel(&self, texture: TextureId, x: u32, y: u32)
        -> Result<[u8; 4], DeviceError>;
    fn texture_write_pixels(
        &self,
        texture: TextureId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), DeviceError>;

    /// Issues one render pass worth of instanced draws.
    fn draw(&self, pass: &RenderPass, draws: &[ShaderDraw]);

    /// Composites the listed passes to the presentation target. Never called
    /// with an empty list.
    fn blit_targets(&self, passes: &[Arc<RenderPass>]);

    fn destroy_image(&self, id: ImageId);
    fn destroy_image_view(&self, id: ImageViewId);
    fn destroy_sampler(&self, id: SamplerId);
    fn destroy_render_pass(&self, id: PassId);
    fn destroy_framebuffer(&self, id: FramebufferId);
    fn destroy_mesh(&self, id: MeshId);
    fn destroy_texture(&self, id: TextureId);
    fn destroy_shader(&self, id: ShaderId);
    fn destroy_instance_buffer(&self, id: BufferId);
}
