use std::sync::Arc;

use crate::renderer::device::RenderDevice;
use crate::renderer::instance::DrawInstanceGroup;
use crate::renderer::material::Material;

/// All instance groups drawing with one material inside one render pass.
///
/// Groups live in a plain vector scanned linearly: order is draw order, and
/// a destroyed group's slot is replaced in place rather than compacted so
/// that order survives across frames.
#[derive(Debug)]
pub struct ShaderDraw {
    material: Arc<Material>,
    instance_groups: Vec<DrawInstanceGroup>,
}

impl ShaderDraw {
    pub fn new(material: Arc<Material>) -> Self {
        Self {
            material,
            instance_groups: Vec::new(),
        }
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn instance_groups(&self) -> &[DrawInstanceGroup] {
        &self.instance_groups
    }

    /// Frame-driver access for destroying individual groups in place. The
    /// tombstone keeps its slot; the next compatible draw replaces it.
    pub fn instance_groups_mut(&mut self) -> &mut [DrawInstanceGroup] {
        &mut self.instance_groups
    }

    /// Instances across all live groups.
    pub fn instance_count(&self) -> usize {
        self.instance_groups
            .iter()
            .filter(|group| !group.is_destroyed())
            .map(|group| group.instance_count())
            .sum()
    }

    pub fn add_instance_group(&mut self, group: DrawInstanceGroup) {
        self.instance_groups.push(group);
    }

    pub(crate) fn group_mut(&mut self, index: usize) -> &mut DrawInstanceGroup {
        &mut self.instance_groups[index]
    }

    /// Overwrites slot `index`, used when a fresh group reclaims a
    /// destroyed slot. The old group must already be a tombstone (its
    /// buffer released by `destroy`), so no device access is needed here.
    pub(crate) fn replace_group(&mut self, index: usize, group: DrawInstanceGroup) {
        debug_assert!(self.instance_groups[index].is_destroyed());
        self.instance_groups[index] = group;
    }

    /// Uploads every live group's instance data ahead of the pass's draw.
    pub(crate) fn sync_buffers(&mut self, device: &dyn RenderDevice) {
        for group in &mut self.instance_groups {
            group.sync_buffer(device);
        }
    }

    /// Releases all GPU resources owned by this draw's groups.
    pub fn destroy(&mut self, device: &dyn RenderDevice) {
        for group in &mut self.instance_groups {
            group.destroy(device);
        }
        self.instance_groups.clear();
    }
}
