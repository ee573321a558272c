use std::sync::Arc;

use crate::renderer::device::{MeshId, RenderDevice};
use crate::renderer::error::DeviceError;

/// An uploaded mesh. Opaque to the batcher apart from its identity: two
/// draws share an instance group only if they reference the same `Arc<Mesh>`.
#[derive(Debug)]
pub struct Mesh {
    label: String,
    id: MeshId,
}

impl Mesh {
    /// Uploads `vertex_data`/`indices` and wraps the resulting device mesh.
    /// The vertex layout is the shader's concern; the batcher never looks
    /// inside.
    pub fn new(
        device: &dyn RenderDevice,
        label: &str,
        vertex_data: &[u8],
        indices: &[u32],
    ) -> Result<Arc<Self>, DeviceError> {
        let id = device.create_mesh(label, vertex_data, indices)?;
        Ok(Arc::new(Self {
            label: label.to_string(),
            id,
        }))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn destroy(&self, device: &dyn RenderDevice) {
        device.destroy_mesh(self.id);
    }
}
