use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::renderer::image::ImageFormat;
use crate::renderer::render_pass::RenderPass;

/// Raw pixel payload for a texture asset, as the asset pipeline hands it
/// over: tightly packed rows, no mip chain.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub pixels: Vec<u8>,
}

/// The asset-resolution boundary material compilation goes through.
///
/// Misses are `None`, not errors; whether a missing asset is fatal is the
/// caller's call (the material cache reports it as a compile error).
pub trait AssetDatabase: Send + Sync {
    fn shader_source(&self, key: &str) -> Option<String>;
    fn texture_data(&self, key: &str) -> Option<TextureData>;
    fn render_pass(&self, name: &str) -> Option<Arc<RenderPass>>;
}

/// In-memory asset database. The real asset pipeline lives outside this
/// crate; this implementation backs tests, the headless demo, and any
/// embedder that preloads its assets.
#[derive(Default)]
pub struct MemoryAssetDatabase {
    inner: Mutex<MemoryAssets>,
}

#[derive(Default)]
struct MemoryAssets {
    shaders: HashMap<String, String>,
    textures: HashMap<String, TextureData>,
    render_passes: HashMap<String, Arc<RenderPass>>,
}

impl MemoryAssetDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_shader(&self, key: &str, source: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.shaders.insert(key.to_string(), source.to_string());
    }

    pub fn insert_texture(&self, key: &str, data: TextureData) {
        let mut inner = self.inner.lock().unwrap();
        inner.textures.insert(key.to_string(), data);
    }

    pub fn insert_render_pass(&self, name: &str, pass: Arc<RenderPass>) {
        let mut inner = self.inner.lock().unwrap();
        inner.render_passes.insert(name.to_string(), pass);
    }
}

impl AssetDatabase for MemoryAssetDatabase {
    fn shader_source(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().shaders.get(key).cloned()
    }

    fn texture_data(&self, key: &str) -> Option<TextureData> {
        self.inner.lock().unwrap().textures.get(key).cloned()
    }

    fn render_pass(&self, name: &str) -> Option<Arc<RenderPass>> {
        self.inner.lock().unwrap().render_passes.get(name).cloned()
    }
}
