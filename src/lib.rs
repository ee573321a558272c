pub mod renderer;

pub use renderer::{
    AssetDatabase, Drawing, Drawings, HeadlessDevice, Material, MaterialCache, MaterialData,
    Mesh, RenderDevice, RenderPass, RenderPassData, Texture,
};
