use serde::{Deserialize, Serialize};

use crate::renderer::device::{
    AttachmentInfo, DependencyInfo, Extent2d, FramebufferDescriptor, FramebufferId, ImageId,
    ImageViewId, PassDescriptor, PassId, ReferenceInfo, RenderDevice, SamplerId, SubpassInfo,
    SUBPASS_EXTERNAL,
};
use crate::renderer::error::{DeviceError, PassError};
use crate::renderer::image::{
    AccessFlags, DependencyFlags, Filter, ImageAspectFlags, ImageDescriptor, ImageFormat,
    ImageLayout, ImageTiling, ImageUsageFlags, LoadOp, MemoryPropertyFlags, PipelineBindPoint,
    PipelineStageFlags, SampleCount, SamplerDescriptor, StoreOp,
};

/// Index into a blueprint's attachment array. A newtype rather than a raw
/// integer so reference validation has a single choke point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentIndex(pub u32);

/// A dependency endpoint: a subpass of this pass, or the implicit external
/// scope before/after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubpassRef {
    External,
    Index(u32),
}

impl SubpassRef {
    fn to_native(self) -> u32 {
        match self {
            SubpassRef::External => SUBPASS_EXTERNAL,
            SubpassRef::Index(index) => index,
        }
    }
}

/// Backing-image parameters of one attachment. `extent` overrides the swap
/// extent when the attachment should not track the surface size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentImageInfo {
    pub mip_levels: u32,
    pub layer_count: u32,
    pub tiling: ImageTiling,
    pub filter: Filter,
    pub usage: ImageUsageFlags,
    pub memory: MemoryPropertyFlags,
    pub aspect: ImageAspectFlags,
    pub access: AccessFlags,
    #[serde(default)]
    pub extent: Option<Extent2d>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescription {
    pub format: ImageFormat,
    pub samples: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
    pub image: AttachmentImageInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReference {
    pub attachment: AttachmentIndex,
    pub layout: ImageLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubpassDescription {
    pub bind_point: PipelineBindPoint,
    #[serde(default)]
    pub color_attachments: Vec<AttachmentReference>,
    #[serde(default)]
    pub input_attachments: Vec<AttachmentReference>,
    #[serde(default)]
    pub resolve_attachments: Vec<AttachmentReference>,
    #[serde(default)]
    pub depth_stencil_attachment: Option<AttachmentReference>,
    #[serde(default)]
    pub preserve_attachments: Vec<AttachmentIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubpassDependency {
    pub src_subpass: SubpassRef,
    pub dst_subpass: SubpassRef,
    pub src_stage_mask: PipelineStageFlags,
    pub dst_stage_mask: PipelineStageFlags,
    pub src_access_mask: AccessFlags,
    pub dst_access_mask: AccessFlags,
    #[serde(default)]
    pub flags: DependencyFlags,
}

/// Declarative render-pass blueprint. Authored as data (typically JSON) by
/// the config layer and immutable once handed in; [`construct`] realizes it
/// against the device.
///
/// [`construct`]: RenderPassData::construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPassData {
    pub name: String,
    pub attachments: Vec<AttachmentDescription>,
    #[serde(default)]
    pub subpasses: Vec<SubpassDescription>,
    #[serde(default)]
    pub dependencies: Vec<SubpassDependency>,
}

/// One compiled attachment: the backing image with its view and sampler.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentImage {
    image: ImageId,
    view: ImageViewId,
    sampler: SamplerId,
    width: u32,
    height: u32,
}

impl AttachmentImage {
    pub fn image(&self) -> ImageId {
        self.image
    }

    pub fn view(&self) -> ImageViewId {
        self.view
    }

    pub fn sampler(&self) -> SamplerId {
        self.sampler
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn release(&self, device: &dyn RenderDevice) {
        device.destroy_sampler(self.sampler);
        device.destroy_image_view(self.view);
        device.destroy_image(self.image);
    }
}

/// A compiled render pass: the native pass handle, a framebuffer, and one
/// backing image per attachment. Created by [`RenderPassData::construct`],
/// released by [`destroy`](RenderPass::destroy).
#[derive(Debug)]
pub struct RenderPass {
    name: String,
    attachments: Vec<AttachmentImage>,
    handle: PassId,
    framebuffer: FramebufferId,
}

impl RenderPass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> PassId {
        self.handle
    }

    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    pub fn attachments(&self) -> &[AttachmentImage] {
        &self.attachments
    }

    /// Releases the framebuffer, the pass handle, then every attachment in
    /// reverse dependency order. Call once, at teardown or before a resize
    /// rebuild.
    pub fn destroy(&mut self, device: &dyn RenderDevice) {
        device.destroy_framebuffer(self.framebuffer);
        device.destroy_render_pass(self.handle);
        for attachment in self.attachments.iter().rev() {
            attachment.release(device);
        }
        self.attachments.clear();
    }
}

impl RenderPassData {
    /// Checks every attachment reference and dependency endpoint against
    /// the declared arrays. Runs before any GPU allocation so authoring
    /// mistakes surface as [`PassError`]s, not native validation failures.
    pub fn validate(&self) -> Result<(), PassError> {
        if self.attachments.is_empty() {
            return Err(PassError::NoAttachments);
        }
        let attachment_count = self.attachments.len();
        for (subpass_index, subpass) in self.subpasses.iter().enumerate() {
            let check_refs = |refs: &[AttachmentReference], kind| {
                check_references(refs, subpass_index, kind, attachment_count)
            };
            check_refs(&subpass.color_attachments, "color")?;
            check_refs(&subpass.input_attachments, "input")?;
            check_refs(&subpass.resolve_attachments, "resolve")?;
            if let Some(depth) = &subpass.depth_stencil_attachment {
                check_references(
                    std::slice::from_ref(depth),
                    subpass_index,
                    "depth-stencil",
                    attachment_count,
                )?;
            }
            for index in &subpass.preserve_attachments {
                if index.0 as usize >= attachment_count {
                    return Err(PassError::ReferenceOutOfBounds {
                        subpass: subpass_index,
                        kind: "preserve",
                        index: index.0,
                        attachment_count,
                    });
                }
            }
        }
        for (dependency_index, dependency) in self.dependencies.iter().enumerate() {
            for endpoint in [dependency.src_subpass, dependency.dst_subpass] {
                if let SubpassRef::Index(index) = endpoint {
                    if index as usize >= self.subpasses.len() {
                        return Err(PassError::DependencyOutOfBounds {
                            dependency: dependency_index,
                            index,
                            subpass_count: self.subpasses.len(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Compiles the blueprint into a live [`RenderPass`].
    ///
    /// Construction is all-or-nothing: a failure at any step releases every
    /// resource already allocated before the error is returned, so a failed
    /// construct never strands GPU memory and the previous pass (if any)
    /// remains usable.
    pub fn construct(&self, device: &dyn RenderDevice) -> Result<RenderPass, PassError> {
        self.validate()?;
        let swap_extent = device.swap_extent();

        let mut attachments: Vec<AttachmentImage> = Vec::with_capacity(self.attachments.len());
        for (index, description) in self.attachments.iter().enumerate() {
            match build_attachment(device, description, swap_extent, &self.name, index) {
                Ok(attachment) => attachments.push(attachment),
                Err(source) => {
                    release_attachments(device, &attachments);
                    log::error!(
                        "failed to build attachment for render pass: pass={} attachment={} error={}",
                        self.name,
                        index,
                        source
                    );
                    return Err(PassError::Attachment { index, source });
                }
            }
        }

        let descriptor = self.translate(device);
        let handle = match device.create_render_pass(&descriptor) {
            Ok(handle) => handle,
            Err(err) => {
                release_attachments(device, &attachments);
                log::error!(
                    "failed to create render pass: pass={} error={}",
                    self.name,
                    err
                );
                return Err(PassError::PassCreation(err));
            }
        };

        let views = attachments.iter().map(|a| a.view()).collect();
        let framebuffer = match device.create_framebuffer(&FramebufferDescriptor {
            pass: handle,
            views,
            width: attachments[0].width(),
            height: attachments[0].height(),
        }) {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                device.destroy_render_pass(handle);
                release_attachments(device, &attachments);
                log::error!(
                    "failed to create framebuffer for render pass: pass={} error={}",
                    self.name,
                    err
                );
                return Err(PassError::Framebuffer(err));
            }
        };

        Ok(RenderPass {
            name: self.name.clone(),
            attachments,
            handle,
            framebuffer,
        })
    }

    /// Lowers the blueprint into the device descriptor form, resolving the
    /// swapchain format and the external-subpass sentinel. Index
    /// correspondence is exact: attachment `i` of the blueprint is
    /// attachment `i` of the descriptor.
    fn translate(&self, device: &dyn RenderDevice) -> PassDescriptor {
        let attachments = self
            .attachments
            .iter()
            .map(|a| AttachmentInfo {
                format: resolve_format(a.format, device),
                samples: a.samples,
                load_op: a.load_op,
                store_op: a.store_op,
                stencil_load_op: a.stencil_load_op,
                stencil_store_op: a.stencil_store_op,
                initial_layout: a.initial_layout,
                final_layout: a.final_layout,
            })
            .collect();
        let subpasses = self
            .subpasses
            .iter()
            .map(|s| SubpassInfo {
                bind_point: s.bind_point,
                color: translate_references(&s.color_attachments),
                input: translate_references(&s.input_attachments),
                resolve: translate_references(&s.resolve_attachments),
                depth_stencil: s.depth_stencil_attachment.as_ref().map(|r| ReferenceInfo {
                    attachment: r.attachment.0,
                    layout: r.layout,
                }),
                preserve: s.preserve_attachments.iter().map(|i| i.0).collect(),
            })
            .collect();
        let dependencies = self
            .dependencies
            .iter()
            .map(|d| DependencyInfo {
                src_subpass: d.src_subpass.to_native(),
                dst_subpass: d.dst_subpass.to_native(),
                src_stage_mask: d.src_stage_mask,
                dst_stage_mask: d.dst_stage_mask,
                src_access_mask: d.src_access_mask,
                dst_access_mask: d.dst_access_mask,
                flags: d.flags,
            })
            .collect();
        PassDescriptor {
            label: self.name.clone(),
            attachments,
            subpasses,
            dependencies,
        }
    }
}

fn check_references(
    refs: &[AttachmentReference],
    subpass: usize,
    kind: &'static str,
    attachment_count: usize,
) -> Result<(), PassError> {
    for reference in refs {
        if reference.attachment.0 as usize >= attachment_count {
            return Err(PassError::ReferenceOutOfBounds {
                subpass,
                kind,
                index: reference.attachment.0,
                attachment_count,
            });
        }
    }
    Ok(())
}

fn translate_references(refs: &[AttachmentReference]) -> Vec<ReferenceInfo> {
    refs.iter()
        .map(|r| ReferenceInfo {
            attachment: r.attachment.0,
            layout: r.layout,
        })
        .collect()
}

fn resolve_format(format: ImageFormat, device: &dyn RenderDevice) -> ImageFormat {
    match format {
        ImageFormat::Swapchain => device.surface_format(),
        other => other,
    }
}

/// Builds one attachment: image, view, sampler, then the transition into
/// its declared initial layout. A failure part-way releases the pieces this
/// attachment already owns (reverse order); the caller releases earlier
/// attachments.
fn build_attachment(
    device: &dyn RenderDevice,
    description: &AttachmentDescription,
    swap_extent: Extent2d,
    pass_name: &str,
    index: usize,
) -> Result<AttachmentImage, DeviceError> {
    let info = &description.image;
    let extent = info.extent.unwrap_or(swap_extent);
    let image = device.create_image(&ImageDescriptor {
        label: format!("{pass_name}/attachment{index}"),
        width: extent.width,
        height: extent.height,
        mip_levels: info.mip_levels,
        layer_count: info.layer_count,
        samples: description.samples,
        format: resolve_format(description.format, device),
        tiling: info.tiling,
        usage: info.usage,
        memory: info.memory,
    })?;
    let view = match device.create_image_view(image, info.aspect) {
        Ok(view) => view,
        Err(err) => {
            device.destroy_image(image);
            return Err(err);
        }
    };
    let sampler = match device.create_sampler(&SamplerDescriptor {
        label: format!("{pass_name}/attachment{index}"),
        mip_levels: info.mip_levels,
        filter: info.filter,
    }) {
        Ok(sampler) => sampler,
        Err(err) => {
            device.destroy_image_view(view);
            device.destroy_image(image);
            return Err(err);
        }
    };
    if let Err(err) =
        device.transition_image_layout(image, description.initial_layout, info.aspect, info.access)
    {
        device.destroy_sampler(sampler);
        device.destroy_image_view(view);
        device.destroy_image(image);
        return Err(err);
    }
    Ok(AttachmentImage {
        image,
        view,
        sampler,
        width: extent.width,
        height: extent.height,
    })
}

fn release_attachments(device: &dyn RenderDevice, attachments: &[AttachmentImage]) {
    for attachment in attachments.iter().rev() {
        attachment.release(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_attachment() -> AttachmentDescription {
        AttachmentDescription {
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
                usage: ImageUsageFlags::COLOR_ATTACHMENT | ImageUsageFlags::SAMPLED,
                memory: MemoryPropertyFlags::DEVICE_LOCAL,
                aspect: ImageAspectFlags::COLOR,
                access: AccessFlags::COLOR_ATTACHMENT_WRITE,
                extent: None,
            },
        }
    }

    #[test]
    fn empty_attachment_list_is_rejected() {
        let data = RenderPassData {
            name: "empty".to_string(),
            attachments: Vec::new(),
            subpasses: Vec::new(),
            dependencies: Vec::new(),
        };
        assert_eq!(data.validate(), Err(PassError::NoAttachments));
    }

    #[test]
    fn out_of_bounds_color_reference_is_rejected() {
        let data = RenderPassData {
            name: "bad".to_string(),
            attachments: vec![color_attachment()],
            subpasses: vec![SubpassDescription {
                bind_point: PipelineBindPoint::Graphics,
                color_attachments: vec![AttachmentReference {
                    attachment: AttachmentIndex(3),
                    layout: ImageLayout::ColorAttachment,
                }],
                input_attachments: Vec::new(),
                resolve_attachments: Vec::new(),
                depth_stencil_attachment: None,
                preserve_attachments: Vec::new(),
            }],
            dependencies: Vec::new(),
        };
        assert_eq!(
            data.validate(),
            Err(PassError::ReferenceOutOfBounds {
                subpass: 0,
                kind: "color",
                index: 3,
                attachment_count: 1,
            })
        );
    }

    #[test]
    fn dependency_on_undeclared_subpass_is_rejected() {
        let data = RenderPassData {
            name: "bad-dep".to_string(),
            attachments: vec![color_attachment()],
            subpasses: Vec::new(),
            dependencies: vec![SubpassDependency {
                src_subpass: SubpassRef::External,
                dst_subpass: SubpassRef::Index(0),
                src_stage_mask: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                dst_stage_mask: PipelineStageFlags::FRAGMENT_SHADER,
                src_access_mask: AccessFlags::COLOR_ATTACHMENT_WRITE,
                dst_access_mask: AccessFlags::SHADER_READ,
                flags: DependencyFlags::BY_REGION,
            }],
        };
        assert_eq!(
            data.validate(),
            Err(PassError::DependencyOutOfBounds {
                dependency: 0,
                index: 0,
                subpass_count: 0,
            })
        );
    }

    #[test]
    fn external_dependency_translates_to_sentinel() {
        assert_eq!(SubpassRef::External.to_native(), SUBPASS_EXTERNAL);
        assert_eq!(SubpassRef::Index(2).to_native(), 2);
    }

    #[test]
    fn blueprint_round_trips_through_json() {
        let data = RenderPassData {
            name: "offscreen".to_string(),
            attachments: vec![color_attachment()],
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
        let json = serde_json::to_string(&data).unwrap();
        let back: RenderPassData = serde_json::from_str(&json).unwrap();
        assert_eq!(data, back);
    }
}
