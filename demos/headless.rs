// Headless frame loop: compile a render pass and a material, submit draws
// from a few producer threads, then drain and render against the counting
// device. Run with RUST_LOG=info to watch the buffer growth and pass logs.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use kiln::renderer::assets::{MemoryAssetDatabase, TextureData};
use kiln::renderer::drawing::{Drawing, Drawings};
use kiln::renderer::headless::HeadlessDevice;
use kiln::renderer::image::{
    AccessFlags, DependencyFlags, Filter, ImageAspectFlags, ImageFormat, ImageLayout, ImageTiling,
    ImageUsageFlags, LoadOp, MemoryPropertyFlags, PipelineBindPoint, PipelineStageFlags,
    SampleCount, StoreOp,
};
use kiln::renderer::instance::DrawInstance;
use kiln::renderer::material::MaterialData;
use kiln::renderer::material_cache::MaterialCache;
use kiln::renderer::mesh::Mesh;
use kiln::renderer::render_pass::{
    AttachmentDescription, AttachmentImageInfo, AttachmentIndex, AttachmentReference,
    RenderPassData, SubpassDependency, SubpassDescription, SubpassRef,
};

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

fn main_pass_blueprint() -> RenderPassData {
    RenderPassData {
        name: "main".to_string(),
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
                usage: ImageUsageFlags::COLOR_ATTACHMENT | ImageUsageFlags::SAMPLED,
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

fn main() {
    init_logging();

    let device = Arc::new(HeadlessDevice::new());
    let assets = Arc::new(MemoryAssetDatabase::new());

    let pass = Arc::new(
        main_pass_blueprint()
            .construct(device.as_ref())
            .expect("render pass construction"),
    );
    assets.insert_render_pass("main", pass);
    assets.insert_shader("shaders/lit", "fn main() {}");
    assets.insert_texture(
        "textures/white",
        TextureData {
            width: 1,
            height: 1,
            format: ImageFormat::Rgba8Unorm,
            pixels: vec![255, 255, 255, 255],
        },
    );

    let cache = MaterialCache::new(device.clone(), assets.clone());
    let material = cache
        .material(&MaterialData {
            name: "lit".to_string(),
            shader: "shaders/lit".to_string(),
            render_pass: "main".to_string(),
            textures: vec!["textures/white".to_string()],
        })
        .expect("material compilation");
    log::info!("compiled {} material(s), {} pending upload", cache.len(), cache.pending_len());

    let mesh = Mesh::new(device.as_ref(), "cube", &[0u8; 36], &[0, 1, 2]).expect("mesh upload");

    let mut drawings = Drawings::new();
    std::thread::scope(|scope| {
        let drawings = &drawings;
        for thread in 0..4 {
            let material = material.clone();
            let mesh = mesh.clone();
            scope.spawn(move || {
                for i in 0..64 {
                    drawings.submit(Drawing {
                        material: material.clone(),
                        mesh: mesh.clone(),
                        shader_data: DrawInstance::new(),
                        transform: Mat4::from_translation(Vec3::new(
                            thread as f32,
                            i as f32,
                            0.0,
                        )),
                        use_blending: false,
                    });
                }
            });
        }
    });

    log::info!("{} drawings pending", drawings.pending_len());
    drawings.drain();
    drawings.render(device.as_ref());

    for call in device.draw_calls() {
        log::info!(
            "draw: pass={} shader_draws={} instances={}",
            call.pass,
            call.shader_draws,
            call.instances
        );
    }
    log::info!("blits: {:?}", device.blit_calls());

    drawings.destroy(device.as_ref());
    log::info!("live GPU objects after teardown: {}", device.live_total());
}
