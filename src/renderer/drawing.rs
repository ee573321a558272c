use std::sync::{Arc, Mutex};

use glam::Mat4;

use crate::renderer::device::RenderDevice;
use crate::renderer::instance::{DrawInstance, DrawInstanceGroup};
use crate::renderer::material::Material;
use crate::renderer::mesh::Mesh;
use crate::renderer::render_pass::RenderPass;
use crate::renderer::shader_draw::ShaderDraw;
use crate::renderer::texture::texture_sets_match;

/// One draw request: render `mesh` with `material` at `transform`.
///
/// Drawings are ephemeral: created by a caller, consumed by the batcher on
/// the next drain, never persisted.
#[derive(Debug, Clone)]
pub struct Drawing {
    pub material: Arc<Material>,
    pub mesh: Arc<Mesh>,
    pub shader_data: DrawInstance,
    pub transform: Mat4,
    pub use_blending: bool,
}

/// All shader draws targeting one compiled render pass.
#[derive(Debug)]
pub struct RenderPassGroup {
    render_pass: Arc<RenderPass>,
    draws: Vec<ShaderDraw>,
}

impl RenderPassGroup {
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    pub fn draws(&self) -> &[ShaderDraw] {
        &self.draws
    }

    /// Frame-driver access for releasing individual groups (e.g. when the
    /// scene object behind a group goes away). Must stay on the drain
    /// thread.
    pub fn draws_mut(&mut self) -> &mut [ShaderDraw] {
        &mut self.draws
    }
}

/// Thread-safe, double-buffered draw collector.
///
/// Any thread may `submit` while the frame driver holds the structure for
/// `drain`/`render`/`destroy`; submission only contends on the back-buffer
/// mutex, which drain holds just long enough to swap buffers. The pass →
/// material → instance-group tree persists across frames; drains refresh
/// its instance contents.
pub struct Drawings {
    groups: Vec<RenderPassGroup>,
    pending: Mutex<Vec<Drawing>>,
    scratch: Vec<Drawing>,
}

impl Drawings {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            pending: Mutex::new(Vec::new()),
            scratch: Vec::new(),
        }
    }

    /// True once any render pass has at least one shader draw. Cheap check
    /// for skipping an empty frame.
    pub fn has_draws(&self) -> bool {
        self.groups.iter().any(|group| !group.draws.is_empty())
    }

    pub fn groups(&self) -> &[RenderPassGroup] {
        &self.groups
    }

    /// See [`RenderPassGroup::draws_mut`].
    pub fn groups_mut(&mut self) -> &mut [RenderPassGroup] {
        &mut self.groups
    }

    /// Number of submissions waiting for the next drain.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Queues one drawing. Append-only, never fails, never blocks beyond
    /// the buffer lock.
    pub fn submit(&self, drawing: Drawing) {
        self.pending.lock().unwrap().push(drawing);
    }

    /// Queues a batch of drawings under a single lock hold.
    pub fn submit_batch(&self, drawings: Vec<Drawing>) {
        self.pending.lock().unwrap().extend(drawings);
    }

    /// Folds every buffered drawing into the group tree. Called exactly
    /// once per frame by the frame driver.
    ///
    /// The buffer swap keeps the submit lock hold O(1) regardless of how
    /// many drawings are pending, so producers are never stalled behind the
    /// fold itself.
    pub fn drain(&mut self) {
        {
            let mut pending = self.pending.lock().unwrap();
            std::mem::swap(&mut *pending, &mut self.scratch);
        }
        let mut drained = std::mem::take(&mut self.scratch);
        for mut drawing in drained.drain(..) {
            drawing.shader_data.set_transform(&drawing.transform);
            let group = self.render_pass_group_mut(drawing.material.render_pass());
            let draw = find_or_add_shader_draw(&mut group.draws, &drawing.material);
            match match_group(draw.instance_groups(), &drawing) {
                Some(index) if !draw.instance_groups()[index].is_destroyed() => {
                    draw.group_mut(index).add_instance(drawing.shader_data);
                }
                slot => {
                    let mut fresh = DrawInstanceGroup::new(
                        drawing.mesh.clone(),
                        drawing.material.clone(),
                        drawing.use_blending,
                    );
                    fresh.add_instance(drawing.shader_data);
                    match slot {
                        Some(index) => draw.replace_group(index, fresh),
                        None => draw.add_instance_group(fresh),
                    }
                }
            }
        }
        // drained is empty here; hand its capacity back for the next frame.
        self.scratch = drained;
    }

    fn render_pass_group_mut(&mut self, render_pass: &Arc<RenderPass>) -> &mut RenderPassGroup {
        let index = self
            .groups
            .iter()
            .position(|group| Arc::ptr_eq(&group.render_pass, render_pass));
        match index {
            Some(index) => &mut self.groups[index],
            None => {
                self.groups.push(RenderPassGroup {
                    render_pass: render_pass.clone(),
                    draws: Vec::new(),
                });
                let last = self.groups.len() - 1;
                &mut self.groups[last]
            }
        }
    }

    /// Issues one draw per render pass holding work, then a single blit
    /// across exactly the touched passes. Passes nothing wrote to this
    /// frame cost neither a draw call nor a blit target.
    pub fn render(&mut self, device: &dyn RenderDevice) {
        if self.groups.is_empty() {
            return;
        }
        let mut touched = Vec::with_capacity(self.groups.len());
        for group in &mut self.groups {
            if group.draws.is_empty() {
                continue;
            }
            for draw in &mut group.draws {
                draw.sync_buffers(device);
            }
            device.draw(&group.render_pass, &group.draws);
            touched.push(group.render_pass.clone());
        }
        if !touched.is_empty() {
            device.blit_targets(&touched);
        }
    }

    /// Releases every group's GPU resources and empties the tree. Shutdown
    /// path; call once.
    pub fn destroy(&mut self, device: &dyn RenderDevice) {
        for group in &mut self.groups {
            for draw in &mut group.draws {
                draw.destroy(device);
            }
        }
        self.groups.clear();
    }
}

impl Default for Drawings {
    fn default() -> Self {
        Self::new()
    }
}

fn find_or_add_shader_draw<'a>(
    draws: &'a mut Vec<ShaderDraw>,
    material: &Arc<Material>,
) -> &'a mut ShaderDraw {
    let index = draws
        .iter()
        .position(|draw| Arc::ptr_eq(draw.material(), material));
    match index {
        Some(index) => &mut draws[index],
        None => {
            draws.push(ShaderDraw::new(material.clone()));
            let last = draws.len() - 1;
            &mut draws[last]
        }
    }
}

/// Finds the slot whose key matches `drawing`: same mesh, same material
/// instance (or the instance's root), same blend flag and an identical
/// texture set. Destroyed slots still match; the caller decides whether to
/// append or replace.
fn match_group(groups: &[DrawInstanceGroup], drawing: &Drawing) -> Option<usize> {
    groups.iter().position(|group| {
        Arc::ptr_eq(group.mesh(), &drawing.mesh)
            && (Arc::ptr_eq(group.material_instance(), &drawing.material)
                || group
                    .material_instance()
                    .root()
                    .is_some_and(|root| Arc::ptr_eq(root, &drawing.material)))
            && group.use_blending() == drawing.use_blending
            && texture_sets_match(group.textures(), drawing.material.textures())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::HeadlessDevice;
    use crate::renderer::image::{
        AccessFlags, Filter, ImageAspectFlags, ImageFormat, ImageLayout, ImageTiling,
        ImageUsageFlags, LoadOp, MemoryPropertyFlags, PipelineBindPoint, SampleCount, StoreOp,
        TextureDescriptor,
    };
    use crate::renderer::material::Shader;
    use crate::renderer::render_pass::{
        AttachmentDescription, AttachmentImageInfo, AttachmentIndex, AttachmentReference,
        RenderPassData, SubpassDescription,
    };
    use crate::renderer::texture::Texture;

    fn compile_pass(device: &HeadlessDevice, name: &str) -> Arc<RenderPass> {
        let data = RenderPassData {
            name: name.to_string(),
            attachments: vec![AttachmentDescription {
                format: ImageFormat::Swapchain,
                samples: SampleCount::Sample1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                stencil_load_op: LoadOp::DontCare,
                stencil_store_op: StoreOp::DontCare,
                initial_layout: ImageLayout::ColorAttachment,
                final_layout: ImageLayout::ShaderReadOnly,
                image: AttachmentImageInfo {
                    mip_levels: 1,
                    layer_count: 1,
                    tiling: ImageTiling::Optimal,
                    filter: Filter::Linear,
                    usage: ImageUsageFlags::COLOR_ATTACHMENT,
                    memory: MemoryPropertyFlags::DEVICE_LOCAL,
                    aspect: ImageAspectFlags::COLOR,
                    access: AccessFlags::COLOR_ATTACHMENT_WRITE,
                    extent: None,
                },
            }],
            subpasses: vec![SubpassDescription {
                bind_point: PipelineBindPoint::Graphics,
                color_attachments: vec![AttachmentReference {
                    attachment: AttachmentIndex(0),
                    layout: ImageLayout::ColorAttachment,
                }],
                input_attachments: Vec::new(),
                resolve_attachments: Vec::new(),
                depth_stencil_attachment: None,
                preserve_attachments: Vec::new(),
            }],
            dependencies: Vec::new(),
        };
        Arc::new(data.construct(device).unwrap())
    }

    fn make_material(
        device: &HeadlessDevice,
        key: &str,
        pass: &Arc<RenderPass>,
        textures: Vec<Arc<Texture>>,
    ) -> Arc<Material> {
        let id = device.create_shader(key, "fn main() {}").unwrap();
        Material::new(key, Arc::new(Shader::new(key, id)), pass.clone(), textures)
    }

    fn make_mesh(device: &HeadlessDevice, label: &str) -> Arc<Mesh> {
        Mesh::new(device, label, &[0u8; 36], &[0, 1, 2]).unwrap()
    }

    fn make_texture(device: &HeadlessDevice, label: &str) -> Arc<Texture> {
        let desc = TextureDescriptor {
            label: label.to_string(),
            width: 1,
            height: 1,
            format: ImageFormat::Rgba8Unorm,
        };
        Texture::new(device, &desc, &[255, 255, 255, 255]).unwrap()
    }

    fn make_drawing(material: &Arc<Material>, mesh: &Arc<Mesh>, use_blending: bool) -> Drawing {
        Drawing {
            material: material.clone(),
            mesh: mesh.clone(),
            shader_data: DrawInstance::new(),
            transform: Mat4::IDENTITY,
            use_blending,
        }
    }

    #[test]
    fn variant_instance_group_matches_draw_with_root_material() {
        let device = HeadlessDevice::new();
        let pass = compile_pass(&device, "main");
        let texture = make_texture(&device, "albedo");
        let root = make_material(&device, "lit", &pass, vec![texture.clone()]);
        let variant = root.create_instance(vec![texture]);
        let mesh = make_mesh(&device, "cube");

        let group = DrawInstanceGroup::new(mesh.clone(), variant, false);
        let groups = vec![group];

        let drawing = make_drawing(&root, &mesh, false);
        assert_eq!(match_group(&groups, &drawing), Some(0));
    }

    #[test]
    fn texture_order_does_not_split_groups() {
        let device = HeadlessDevice::new();
        let pass = compile_pass(&device, "main");
        let t1 = make_texture(&device, "a");
        let t2 = make_texture(&device, "b");
        let root = make_material(&device, "lit", &pass, vec![t1.clone(), t2.clone()]);
        let reordered = root.create_instance(vec![t2, t1]);
        let mesh = make_mesh(&device, "cube");

        let groups = vec![DrawInstanceGroup::new(mesh.clone(), reordered, false)];
        let drawing = make_drawing(&root, &mesh, false);
        assert_eq!(match_group(&groups, &drawing), Some(0));
    }

    #[test]
    fn differing_texture_sets_split_groups() {
        let device = HeadlessDevice::new();
        let pass = compile_pass(&device, "main");
        let t1 = make_texture(&device, "a");
        let t2 = make_texture(&device, "b");
        let root = make_material(&device, "lit", &pass, vec![t1.clone()]);
        let swapped = root.create_instance(vec![t2]);
        let mesh = make_mesh(&device, "cube");

        let groups = vec![DrawInstanceGroup::new(mesh.clone(), swapped, false)];
        let drawing = make_drawing(&root, &mesh, false);
        assert_eq!(match_group(&groups, &drawing), None);
    }

    #[test]
    fn blend_flag_splits_groups() {
        let device = HeadlessDevice::new();
        let pass = compile_pass(&device, "main");
        let material = make_material(&device, "lit", &pass, Vec::new());
        let mesh = make_mesh(&device, "cube");

        let groups = vec![DrawInstanceGroup::new(mesh.clone(), material.clone(), true)];
        let drawing = make_drawing(&material, &mesh, false);
        assert_eq!(match_group(&groups, &drawing), None);
    }
}
