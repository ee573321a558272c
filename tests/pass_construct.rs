use kiln::renderer::device::RenderDevice;
use kiln::renderer::error::PassError;
use kiln::renderer::headless::{HeadlessDevice, ResourceKind};
use kiln::renderer::image::{
    AccessFlags, DependencyFlags, Filter, ImageAspectFlags, ImageFormat, ImageLayout, ImageTiling,
    ImageUsageFlags, LoadOp, MemoryPropertyFlags, PipelineBindPoint, PipelineStageFlags,
    SampleCount, StoreOp,
};
use kiln::renderer::render_pass::{
    AttachmentDescription, AttachmentImageInfo, AttachmentIndex, AttachmentReference,
    RenderPassData, SubpassDependency, SubpassDescription, SubpassRef,
};
use kiln::renderer::SUBPASS_EXTERNAL;

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

fn depth_attachment() -> AttachmentDescription {
    AttachmentDescription {
        format: ImageFormat::Depth32Float,
        samples: SampleCount::Sample1,
        load_op: LoadOp::Clear,
        store_op: StoreOp::DontCare,
        stencil_load_op: LoadOp::DontCare,
        stencil_store_op: StoreOp::DontCare,
        initial_layout: ImageLayout::DepthStencilAttachment,
        final_layout: ImageLayout::DepthStencilAttachment,
        image: AttachmentImageInfo {
            mip_levels: 1,
            layer_count: 1,
            tiling: ImageTiling::Optimal,
            filter: Filter::Nearest,
            usage: ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            memory: MemoryPropertyFlags::DEVICE_LOCAL,
            aspect: ImageAspectFlags::DEPTH,
            access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            extent: None,
        },
    }
}

/// Color + depth pass with one graphics subpass and an external dependency.
fn geometry_blueprint() -> RenderPassData {
    RenderPassData {
        name: "geometry".to_string(),
        attachments: vec![color_attachment(), depth_attachment()],
        subpasses: vec![SubpassDescription {
            bind_point: PipelineBindPoint::Graphics,
            color_attachments: vec![AttachmentReference {
                attachment: AttachmentIndex(0),
                layout: ImageLayout::ColorAttachment,
            }],
            input_attachments: Vec::new(),
            resolve_attachments: Vec::new(),
            depth_stencil_attachment: Some(AttachmentReference {
                attachment: AttachmentIndex(1),
                layout: ImageLayout::DepthStencilAttachment,
            }),
            preserve_attachments: Vec::new(),
        }],
        dependencies: vec![SubpassDependency {
            src_subpass: SubpassRef::External,
            dst_subpass: SubpassRef::Index(0),
            src_stage_mask: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_stage_mask: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            src_access_mask: AccessFlags::empty(),
            dst_access_mask: AccessFlags::COLOR_ATTACHMENT_WRITE,
            flags: DependencyFlags::BY_REGION,
        }],
    }
}

#[test]
fn construct_allocates_one_image_view_sampler_per_attachment() {
    let device = HeadlessDevice::new();
    let pass = geometry_blueprint().construct(&device).unwrap();

    assert_eq!(device.created_count(ResourceKind::Image), 2);
    assert_eq!(device.created_count(ResourceKind::ImageView), 2);
    assert_eq!(device.created_count(ResourceKind::Sampler), 2);
    assert_eq!(device.created_count(ResourceKind::RenderPass), 1);
    assert_eq!(device.created_count(ResourceKind::Framebuffer), 1);
    assert_eq!(pass.attachments().len(), 2);

    // Attachments were transitioned into their declared initial layouts.
    assert_eq!(
        device.image_layout(pass.attachments()[0].image()),
        Some(ImageLayout::ColorAttachment)
    );
    assert_eq!(
        device.image_layout(pass.attachments()[1].image()),
        Some(ImageLayout::DepthStencilAttachment)
    );

    // Attachments track the swap extent unless overridden.
    let extent = device.swap_extent();
    assert_eq!(pass.attachments()[0].width(), extent.width);
    assert_eq!(pass.attachments()[0].height(), extent.height);
}

#[test]
fn translation_preserves_attachment_index_correspondence() {
    let device = HeadlessDevice::new();
    let blueprint = geometry_blueprint();
    let pass = blueprint.construct(&device).unwrap();
    let descriptor = device.pass_descriptor(pass.handle()).unwrap();

    assert_eq!(descriptor.label, "geometry");
    assert_eq!(descriptor.attachments.len(), 2);
    // Swapchain format resolved at translation time; depth carried through.
    assert_eq!(descriptor.attachments[0].format, device.surface_format());
    assert_eq!(descriptor.attachments[1].format, ImageFormat::Depth32Float);

    assert_eq!(descriptor.subpasses.len(), 1);
    let subpass = &descriptor.subpasses[0];
    assert_eq!(subpass.color.len(), 1);
    assert_eq!(subpass.color[0].attachment, 0);
    assert_eq!(
        subpass.depth_stencil.map(|r| r.attachment),
        Some(1),
        "depth reference keeps blueprint index"
    );

    assert_eq!(descriptor.dependencies.len(), 1);
    assert_eq!(descriptor.dependencies[0].src_subpass, SUBPASS_EXTERNAL);
    assert_eq!(descriptor.dependencies[0].dst_subpass, 0);
}

#[test]
fn image_failure_rolls_back_earlier_attachments() {
    let device = HeadlessDevice::new();
    let mut blueprint = geometry_blueprint();
    blueprint.attachments.push(color_attachment());

    // Attachments 0 and 1 build; attachment 2's image fails.
    device.fail_after(ResourceKind::Image, 2);
    let err = blueprint.construct(&device).unwrap_err();
    assert!(matches!(err, PassError::Attachment { index: 2, .. }));
    assert_eq!(device.live_total(), 0, "no partial render pass escapes");
    assert_eq!(device.created_count(ResourceKind::Image), 2);
    assert_eq!(device.destroyed_count(ResourceKind::Image), 2);
}

#[test]
fn view_failure_rolls_back_everything() {
    let device = HeadlessDevice::new();
    device.fail_after(ResourceKind::ImageView, 1);
    let err = geometry_blueprint().construct(&device).unwrap_err();
    assert!(matches!(err, PassError::Attachment { index: 1, .. }));
    assert_eq!(device.live_total(), 0);
}

#[test]
fn sampler_failure_rolls_back_everything() {
    let device = HeadlessDevice::new();
    device.fail_after(ResourceKind::Sampler, 0);
    let err = geometry_blueprint().construct(&device).unwrap_err();
    assert!(matches!(err, PassError::Attachment { index: 0, .. }));
    assert_eq!(device.live_total(), 0);
}

#[test]
fn transition_failure_rolls_back_everything() {
    let device = HeadlessDevice::new();
    device.fail_transitions_after(1);
    let err = geometry_blueprint().construct(&device).unwrap_err();
    assert!(matches!(err, PassError::Attachment { index: 1, .. }));
    assert_eq!(device.live_total(), 0);
}

#[test]
fn pass_creation_failure_releases_attachments() {
    let device = HeadlessDevice::new();
    device.fail_after(ResourceKind::RenderPass, 0);
    let err = geometry_blueprint().construct(&device).unwrap_err();
    assert!(matches!(err, PassError::PassCreation(_)));
    assert_eq!(device.live_total(), 0);
}

#[test]
fn framebuffer_failure_releases_pass_and_attachments() {
    let device = HeadlessDevice::new();
    device.fail_after(ResourceKind::Framebuffer, 0);
    let err = geometry_blueprint().construct(&device).unwrap_err();
    assert!(matches!(err, PassError::Framebuffer(_)));
    assert_eq!(device.live_total(), 0);
}

#[test]
fn invalid_blueprint_fails_before_any_allocation() {
    let device = HeadlessDevice::new();
    let mut blueprint = geometry_blueprint();
    blueprint.subpasses[0].color_attachments[0].attachment = AttachmentIndex(9);

    let err = blueprint.construct(&device).unwrap_err();
    assert!(matches!(err, PassError::ReferenceOutOfBounds { .. }));
    assert_eq!(device.created_count(ResourceKind::Image), 0);
    assert_eq!(device.live_total(), 0);
}

#[test]
fn destroy_releases_every_compiled_resource() {
    let device = HeadlessDevice::new();
    let mut pass = geometry_blueprint().construct(&device).unwrap();
    assert_eq!(device.live_total(), 8); // 2 images + 2 views + 2 samplers + pass + framebuffer

    pass.destroy(&device);
    assert_eq!(device.live_total(), 0);
    assert!(pass.attachments().is_empty());
}

#[test]
fn failed_construct_leaves_previous_pass_usable() {
    let device = HeadlessDevice::new();
    let previous = geometry_blueprint().construct(&device).unwrap();
    let live_before = device.live_total();

    device.fail_after(ResourceKind::Image, 0);
    assert!(geometry_blueprint().construct(&device).is_err());

    // The failed rebuild released only its own allocations.
    assert_eq!(device.live_total(), live_before);
    assert_eq!(
        device.image_layout(previous.attachments()[0].image()),
        Some(ImageLayout::ColorAttachment)
    );
}

#[test]
fn attachment_extent_override_is_honored() {
    let device = HeadlessDevice::new();
    let mut blueprint = geometry_blueprint();
    blueprint.attachments[0].image.extent = Some(kiln::renderer::Extent2d {
        width: 512,
        height: 512,
    });
    blueprint.attachments[1].image.extent = Some(kiln::renderer::Extent2d {
        width: 512,
        height: 512,
    });

    let pass = blueprint.construct(&device).unwrap();
    assert_eq!(pass.attachments()[0].width(), 512);
    assert_eq!(pass.attachments()[0].height(), 512);
}

#[test]
fn blueprint_json_fixture_constructs() {
    let json = r#"{
        "name": "offscreen",
        "attachments": [{
            "format": "Rgba16Float",
            "samples": "Sample4",
            "load_op": "Clear",
            "store_op": "Store",
            "stencil_load_op": "DontCare",
            "stencil_store_op": "DontCare",
            "initial_layout": "ColorAttachment",
            "final_layout": "ShaderReadOnly",
            "image": {
                "mip_levels": 1,
                "layer_count": 1,
                "tiling": "Optimal",
                "filter": "Linear",
                "usage": "COLOR_ATTACHMENT | SAMPLED",
                "memory": "DEVICE_LOCAL",
                "aspect": "COLOR",
                "access": "COLOR_ATTACHMENT_WRITE"
            }
        }],
        "subpasses": [{
            "bind_point": "Graphics",
            "color_attachments": [{ "attachment": 0, "layout": "ColorAttachment" }]
        }]
    }"#;
    let blueprint: RenderPassData = serde_json::from_str(json).unwrap();
    assert_eq!(blueprint.name, "offscreen");

    let device = HeadlessDevice::new();
    let pass = blueprint.construct(&device).unwrap();
    let descriptor = device.pass_descriptor(pass.handle()).unwrap();
    assert_eq!(descriptor.attachments[0].format, ImageFormat::Rgba16Float);
    assert_eq!(descriptor.attachments[0].samples, SampleCount::Sample4);
}
