use std::sync::Arc;

use crate::renderer::device::{RenderDevice, TextureId};
use crate::renderer::error::DeviceError;
use crate::renderer::image::TextureDescriptor;

/// An uploaded texture. Like [`Mesh`](crate::renderer::Mesh), identity is
/// the `Arc` pointer: instance-group compatibility compares texture sets by
/// identity, not by contents.
#[derive(Debug)]
pub struct Texture {
    label: String,
    id: TextureId,
}

impl Texture {
    pub fn new(
        device: &dyn RenderDevice,
        desc: &TextureDescriptor,
        pixels: &[u8],
    ) -> Result<Arc<Self>, DeviceError> {
        let id = device.create_texture(desc, pixels)?;
        Ok(Arc::new(Self {
            label: desc.label.clone(),
            id,
        }))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn destroy(&self, device: &dyn RenderDevice) {
        device.destroy_texture(self.id);
    }
}

/// Identity-based set equality for texture lists: equal length and every
/// texture of each list present in the other, order ignored.
pub fn texture_sets_match(a: &[Arc<Texture>], b: &[Arc<Texture>]) -> bool {
    a.len() == b.len()
        && a.iter().all(|t| b.iter().any(|u| Arc::ptr_eq(t, u)))
        && b.iter().all(|t| a.iter().any(|u| Arc::ptr_eq(t, u)))
}
