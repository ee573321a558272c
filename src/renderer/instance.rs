use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::renderer::device::{BufferId, RenderDevice};
use crate::renderer::material::Material;
use crate::renderer::mesh::Mesh;
use crate::renderer::texture::Texture;

/// Instance buffers start at this many instances and grow by doubling.
const INITIAL_INSTANCE_CAPACITY: usize = 16;

/// Per-instance shader data, laid out for direct upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawInstance {
    pub model: [[f32; 4]; 4], // 64 bytes
    pub color: [f32; 4],      // 16 bytes
    pub uv: [f32; 4],         // 16 bytes: offset.xy, scale.xy
    pub flags: u32,           // 4 bytes
    pub _padding: [u32; 3],   // 12 bytes (ensures 112 byte stride)
}

impl DrawInstance {
    pub fn new() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0, 1.0, 1.0, 1.0],
            uv: [0.0, 0.0, 1.0, 1.0],
            flags: 0,
            _padding: [0; 3],
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Stamps the drawing's transform into the record. Called by the
    /// batcher during drain, immediately before grouping.
    pub fn set_transform(&mut self, transform: &Mat4) {
        self.model = transform.to_cols_array_2d();
    }
}

impl Default for DrawInstance {
    fn default() -> Self {
        Self::new()
    }
}

/// One instanced draw's bucket: every instance sharing a mesh, a material
/// instance (or its root), a blend mode and a texture set.
///
/// The group owns its GPU instance buffer. A destroyed group is a
/// tombstone: it keeps its slot so draw order stays stable, but never
/// accepts instances again; the batcher allocates a fresh group into the
/// same slot instead.
#[derive(Debug)]
pub struct DrawInstanceGroup {
    mesh: Arc<Mesh>,
    material_instance: Arc<Material>,
    textures: Vec<Arc<Texture>>,
    use_blending: bool,
    instances: Vec<DrawInstance>,
    buffer: Option<BufferId>,
    buffer_capacity: usize,
    destroyed: bool,
}

impl DrawInstanceGroup {
    /// Creates an empty group keyed to `mesh`/`material_instance`/
    /// `use_blending`. The texture set is copied off the material instance.
    pub fn new(mesh: Arc<Mesh>, material_instance: Arc<Material>, use_blending: bool) -> Self {
        let textures = material_instance.textures().to_vec();
        Self {
            mesh,
            material_instance,
            textures,
            use_blending,
            instances: Vec::new(),
            buffer: None,
            buffer_capacity: 0,
            destroyed: false,
        }
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn material_instance(&self) -> &Arc<Material> {
        &self.material_instance
    }

    pub fn textures(&self) -> &[Arc<Texture>] {
        &self.textures
    }

    pub fn use_blending(&self) -> bool {
        self.use_blending
    }

    pub fn instances(&self) -> &[DrawInstance] {
        &self.instances
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Appends one instance record. Must not be called on a destroyed
    /// group; the batcher replaces the slot instead.
    pub fn add_instance(&mut self, instance: DrawInstance) {
        debug_assert!(!self.destroyed, "instance appended to a destroyed group");
        self.instances.push(instance);
    }

    /// Brings the GPU buffer up to date with the CPU-side instance list,
    /// growing it by doubling when the instance count outruns capacity.
    ///
    /// Buffer trouble is logged and swallowed: the instance data stays
    /// intact and the next frame retries. Rendering is not a fallible
    /// operation at this layer.
    pub fn sync_buffer(&mut self, device: &dyn RenderDevice) {
        if self.destroyed || self.instances.is_empty() {
            return;
        }
        let required = self.instances.len();
        if self.buffer.is_none() || required > self.buffer_capacity {
            let new_capacity = required
                .max(self.buffer_capacity * 2)
                .max(INITIAL_INSTANCE_CAPACITY);
            if self.buffer.is_some() {
                log::info!(
                    "Growing instance buffer: {} -> {}",
                    self.buffer_capacity,
                    new_capacity
                );
            }
            let size = (new_capacity * std::mem::size_of::<DrawInstance>()) as u64;
            match device.create_instance_buffer(size) {
                Ok(buffer) => {
                    if let Some(old) = self.buffer.take() {
                        device.destroy_instance_buffer(old);
                    }
                    self.buffer = Some(buffer);
                    self.buffer_capacity = new_capacity;
                }
                Err(err) => {
                    log::error!("failed to allocate instance buffer: {err}");
                    return;
                }
            }
        }
        if let Some(buffer) = self.buffer {
            if let Err(err) =
                device.write_instance_buffer(buffer, bytemuck::cast_slice(&self.instances))
            {
                log::error!("failed to write instance buffer: {err}");
            }
        }
    }

    /// Releases the GPU buffer and marks the group as a tombstone.
    pub fn destroy(&mut self, device: &dyn RenderDevice) {
        if let Some(buffer) = self.buffer.take() {
            device.destroy_instance_buffer(buffer);
        }
        self.buffer_capacity = 0;
        self.instances.clear();
        self.destroyed = true;
    }
}
