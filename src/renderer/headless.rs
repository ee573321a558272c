use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::renderer::device::{
    BufferId, Extent2d, FramebufferDescriptor, FramebufferId, ImageId, ImageViewId,
    PassDescriptor, PassId, MeshId, RenderDevice, SamplerId, ShaderId, TextureId,
};
use crate::renderer::error::DeviceError;
use crate::renderer::image::{
    AccessFlags, ImageAspectFlags, ImageDescriptor, ImageFormat, ImageLayout, SamplerDescriptor,
    TextureDescriptor,
};
use crate::renderer::render_pass::RenderPass;
use crate::renderer::shader_draw::ShaderDraw;

/// Resource categories the headless device accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    ImageView,
    Sampler,
    RenderPass,
    Framebuffer,
    Mesh,
    Texture,
    Shader,
    InstanceBuffer,
}

/// One recorded `draw` call.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub pass: String,
    pub shader_draws: usize,
    pub instances: usize,
}

struct TexturePixels {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

struct InstanceBuffer {
    size: u64,
    contents: Vec<u8>,
}

#[derive(Default)]
struct DeviceState {
    next_id: u64,
    live: HashMap<ResourceKind, HashSet<u64>>,
    created: HashMap<ResourceKind, u32>,
    destroyed: HashMap<ResourceKind, u32>,
    fail_after: HashMap<ResourceKind, u32>,
    fail_transitions: Option<u32>,
    layouts: HashMap<u64, ImageLayout>,
    textures: HashMap<u64, TexturePixels>,
    buffers: HashMap<u64, InstanceBuffer>,
    pass_descriptors: HashMap<u64, PassDescriptor>,
    draw_calls: Vec<DrawCall>,
    blit_calls: Vec<Vec<String>>,
}

/// A [`RenderDevice`] with no GPU behind it.
///
/// Every resource is a counter entry; creates and destroys are tracked per
/// [`ResourceKind`], draws and blits are recorded, and creation failures can
/// be scripted with [`fail_after`](HeadlessDevice::fail_after). Backs the
/// test suite and the headless demo, and is usable as a real backend for
/// server-side runs that need the frame loop without presentation.
pub struct HeadlessDevice {
    extent: Extent2d,
    surface_format: ImageFormat,
    state: Mutex<DeviceState>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::with_extent(1280, 720)
    }

    pub fn with_extent(width: u32, height: u32) -> Self {
        Self {
            extent: Extent2d { width, height },
            surface_format: ImageFormat::Bgra8Unorm,
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// Scripts a failure: the next `successes` creations of `kind` succeed,
    /// every one after that fails with [`DeviceError::OutOfMemory`].
    pub fn fail_after(&self, kind: ResourceKind, successes: u32) {
        self.state
            .lock()
            .unwrap()
            .fail_after
            .insert(kind, successes);
    }

    /// Scripts layout-transition failures the same way as
    /// [`fail_after`](HeadlessDevice::fail_after).
    pub fn fail_transitions_after(&self, successes: u32) {
        self.state.lock().unwrap().fail_transitions = Some(successes);
    }

    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .live
            .get(&kind)
            .map_or(0, |set| set.len())
    }

    /// Live objects across all kinds; zero means nothing leaked.
    pub fn live_total(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .live
            .values()
            .map(|set| set.len())
            .sum()
    }

    pub fn created_count(&self, kind: ResourceKind) -> u32 {
        self.state
            .lock()
            .unwrap()
            .created
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    pub fn destroyed_count(&self, kind: ResourceKind) -> u32 {
        self.state
            .lock()
            .unwrap()
            .destroyed
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.lock().unwrap().draw_calls.clone()
    }

    /// Recorded blit calls, each the list of touched pass names.
    pub fn blit_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().blit_calls.clone()
    }

    /// The translated descriptor a render pass was created from.
    pub fn pass_descriptor(&self, pass: PassId) -> Option<PassDescriptor> {
        self.state
            .lock()
            .unwrap()
            .pass_descriptors
            .get(&pass.0)
            .cloned()
    }

    /// The layout an image was last transitioned to.
    pub fn image_layout(&self, image: ImageId) -> Option<ImageLayout> {
        self.state.lock().unwrap().layouts.get(&image.0).copied()
    }

    /// Bytes last written to an instance buffer.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .buffers
            .get(&buffer.0)
            .map(|b| b.contents.clone())
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn allocate(state: &mut DeviceState, kind: ResourceKind) -> Result<u64, DeviceError> {
    if let Some(remaining) = state.fail_after.get_mut(&kind) {
        if *remaining == 0 {
            return Err(DeviceError::OutOfMemory);
        }
        *remaining -= 1;
    }
    state.next_id += 1;
    let id = state.next_id;
    state.live.entry(kind).or_default().insert(id);
    *state.created.entry(kind).or_default() += 1;
    Ok(id)
}

fn release(state: &mut DeviceState, kind: ResourceKind, id: u64) {
    if state.live.entry(kind).or_default().remove(&id) {
        *state.destroyed.entry(kind).or_default() += 1;
    } else {
        log::warn!("destroy of unknown {kind:?} id {id}");
    }
}

fn is_live(state: &DeviceState, kind: ResourceKind, id: u64) -> bool {
    state.live.get(&kind).is_some_and(|set| set.contains(&id))
}

impl RenderDevice for HeadlessDevice {
    fn swap_extent(&self) -> Extent2d {
        self.extent
    }

    fn surface_format(&self) -> ImageFormat {
        self.surface_format
    }

    fn create_image(&self, _desc: &ImageDescriptor) -> Result<ImageId, DeviceError> {
        let mut state = self.state.lock().unwrap();
        let id = allocate(&mut state, ResourceKind::Image)?;
        state.layouts.insert(id, ImageLayout::Undefined);
        Ok(ImageId(id))
    }

    fn create_image_view(
        &self,
        image: ImageId,
        _aspect: ImageAspectFlags,
    ) -> Result<ImageViewId, DeviceError> {
        let mut state = self.state.lock().unwrap();
        if !is_live(&state, ResourceKind::Image, image.0) {
            return Err(DeviceError::InvalidHandle);
        }
        allocate(&mut state, ResourceKind::ImageView).map(ImageViewId)
    }

    fn create_sampler(&self, _desc: &SamplerDescriptor) -> Result<SamplerId, DeviceError> {
        let mut state = self.state.lock().unwrap();
        allocate(&mut state, ResourceKind::Sampler).map(SamplerId)
    }

    fn transition_image_layout(
        &self,
        image: ImageId,
        layout: ImageLayout,
        _aspect: ImageAspectFlags,
        _access: AccessFlags,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        if !is_live(&state, ResourceKind::Image, image.0) {
            return Err(DeviceError::InvalidHandle);
        }
        if let Some(remaining) = state.fail_transitions.as_mut() {
            if *remaining == 0 {
                return Err(DeviceError::OutOfMemory);
            }
            *remaining -= 1;
        }
        state.layouts.insert(image.0, layout);
        Ok(())
    }

    fn create_render_pass(&self, desc: &PassDescriptor) -> Result<PassId, DeviceError> {
        let mut state = self.state.lock().unwrap();
        let id = allocate(&mut state, ResourceKind::RenderPass)?;
        state.pass_descriptors.insert(id, desc.clone());
        Ok(PassId(id))
    }

    fn create_framebuffer(&self, desc: &FramebufferDescriptor) -> Result<FramebufferId, DeviceError> {
        let mut state = self.state.lock().unwrap();
        if !is_live(&state, ResourceKind::RenderPass, desc.pass.0) {
            return Err(DeviceError::InvalidHandle);
        }
        for view in &desc.views {
            if !is_live(&state, ResourceKind::ImageView, view.0) {
                return Err(DeviceError::InvalidHandle);
            }
        }
        allocate(&mut state, ResourceKind::Framebuffer).map(FramebufferId)
    }

    fn create_mesh(
        &self,
        _label: &str,
        _vertex_data: &[u8],
        _indices: &[u32],
    ) -> Result<MeshId, DeviceError> {
        let mut state = self.state.lock().unwrap();
        allocate(&mut state, ResourceKind::Mesh).map(MeshId)
    }

    fn create_texture(&self, desc: &TextureDescriptor, pixels: &[u8]) -> Result<TextureId, DeviceError> {
        let expected = desc.width as usize * desc.height as usize * 4;
        if pixels.len() != expected {
            return Err(DeviceError::Backend(format!(
                "texture '{}' payload is {} bytes, expected {}",
                desc.label,
                pixels.len(),
                expected
            )));
        }
        let mut state = self.state.lock().unwrap();
        let id = allocate(&mut state, ResourceKind::Texture)?;
        state.textures.insert(
            id,
            TexturePixels {
                width: desc.width,
                height: desc.height,
                pixels: pixels.to_vec(),
            },
        );
        Ok(TextureId(id))
    }

    fn create_shader(&self, label: &str, source: &str) -> Result<ShaderId, DeviceError> {
        if source.trim().is_empty() {
            return Err(DeviceError::Backend(format!("shader '{label}' has empty source")));
        }
        let mut state = self.state.lock().unwrap();
        allocate(&mut state, ResourceKind::Shader).map(ShaderId)
    }

    fn create_instance_buffer(&self, size: u64) -> Result<BufferId, DeviceError> {
        let mut state = self.state.lock().unwrap();
        let id = allocate(&mut state, ResourceKind::InstanceBuffer)?;
        state.buffers.insert(
            id,
            InstanceBuffer {
                size,
                contents: Vec::new(),
            },
        );
        Ok(BufferId(id))
    }

    fn write_instance_buffer(&self, buffer: BufferId, data: &[u8]) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .buffers
            .get_mut(&buffer.0)
            .ok_or(DeviceError::InvalidHandle)?;
        if data.len() as u64 > entry.size {
            return Err(DeviceError::Backend(format!(
                "write of {} bytes exceeds buffer size {}",
                data.len(),
                entry.size
            )));
        }
        entry.contents = data.to_vec();
        Ok(())
    }

    fn texture_read_pixel(&self, texture: TextureId, x: u32, y: u32) -> Result<[u8; 4], DeviceError> {
        let state = self.state.lock().unwrap();
        let entry = state
            .textures
            .get(&texture.0)
            .ok_or(DeviceError::InvalidHandle)?;
        if x >= entry.width || y >= entry.height {
            return Err(DeviceError::Backend(format!(
                "pixel read at ({x}, {y}) outside {}x{}",
                entry.width, entry.height
            )));
        }
        let offset = ((y * entry.width + x) * 4) as usize;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&entry.pixels[offset..offset + 4]);
        Ok(pixel)
    }

    fn texture_write_pixels(
        &self,
        texture: TextureId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), DeviceError> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(DeviceError::Backend(format!(
                "pixel write payload is {} bytes, expected {}",
                pixels.len(),
                width as usize * height as usize * 4
            )));
        }
        let mut state = self.state.lock().unwrap();
        let entry = state
            .textures
            .get_mut(&texture.0)
            .ok_or(DeviceError::InvalidHandle)?;
        if x + width > entry.width || y + height > entry.height {
            return Err(DeviceError::Backend(format!(
                "pixel write region ({x}, {y}) {width}x{height} outside {}x{}",
                entry.width, entry.height
            )));
        }
        for row in 0..height {
            let src = (row * width * 4) as usize;
            let dst = (((y + row) * entry.width + x) * 4) as usize;
            let len = (width * 4) as usize;
            entry.pixels[dst..dst + len].copy_from_slice(&pixels[src..src + len]);
        }
        Ok(())
    }

    fn draw(&self, pass: &RenderPass, draws: &[ShaderDraw]) {
        let instances = draws.iter().map(|draw| draw.instance_count()).sum();
        let mut state = self.state.lock().unwrap();
        state.draw_calls.push(DrawCall {
            pass: pass.name().to_string(),
            shader_draws: draws.len(),
            instances,
        });
    }

    fn blit_targets(&self, passes: &[Arc<RenderPass>]) {
        let names = passes.iter().map(|pass| pass.name().to_string()).collect();
        let mut state = self.state.lock().unwrap();
        state.blit_calls.push(names);
    }

    fn destroy_image(&self, id: ImageId) {
        let mut state = self.state.lock().unwrap();
        release(&mut state, ResourceKind::Image, id.0);
        state.layouts.remove(&id.0);
    }

    fn destroy_image_view(&self, id: ImageViewId) {
        release(&mut self.state.lock().unwrap(), ResourceKind::ImageView, id.0);
    }

    fn destroy_sampler(&self, id: SamplerId) {
        release(&mut self.state.lock().unwrap(), ResourceKind::Sampler, id.0);
    }

    fn destroy_render_pass(&self, id: PassId) {
        let mut state = self.state.lock().unwrap();
        release(&mut state, ResourceKind::RenderPass, id.0);
        state.pass_descriptors.remove(&id.0);
    }

    fn destroy_framebuffer(&self, id: FramebufferId) {
        release(&mut self.state.lock().unwrap(), ResourceKind::Framebuffer, id.0);
    }

    fn destroy_mesh(&self, id: MeshId) {
        release(&mut self.state.lock().unwrap(), ResourceKind::Mesh, id.0);
    }

    fn destroy_texture(&self, id: TextureId) {
        let mut state = self.state.lock().unwrap();
        release(&mut state, ResourceKind::Texture, id.0);
        state.textures.remove(&id.0);
    }

    fn destroy_shader(&self, id: ShaderId) {
        release(&mut self.state.lock().unwrap(), ResourceKind::Shader, id.0);
    }

    fn destroy_instance_buffer(&self, id: BufferId) {
        let mut state = self.state.lock().unwrap();
        release(&mut state, ResourceKind::InstanceBuffer, id.0);
        state.buffers.remove(&id.0);
    }
}
