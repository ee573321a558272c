pub mod assets;
pub mod device;
pub mod drawing;
pub mod error;
pub mod headless;
pub mod image;
pub mod instance;
pub mod material;
pub mod material_cache;
pub mod mesh;
pub mod render_pass;
pub mod shader_draw;
pub mod texture;

pub use assets::{AssetDatabase, MemoryAssetDatabase, TextureData};
pub use device::{Extent2d, PassDescriptor, RenderDevice, SUBPASS_EXTERNAL};
pub use drawing::{Drawing, Drawings, RenderPassGroup};
pub use error::{DeviceError, MaterialError, PassError};
pub use headless::{HeadlessDevice, ResourceKind};
pub use instance::{DrawInstance, DrawInstanceGroup};
pub use material::{Material, MaterialData, Shader};
pub use material_cache::MaterialCache;
pub use mesh::Mesh;
pub use render_pass::{RenderPass, RenderPassData};
pub use shader_draw::ShaderDraw;
pub use texture::Texture;
