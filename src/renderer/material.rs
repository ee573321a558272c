use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::renderer::assets::AssetDatabase;
use crate::renderer::device::{RenderDevice, ShaderId};
use crate::renderer::error::MaterialError;
use crate::renderer::image::TextureDescriptor;
use crate::renderer::render_pass::RenderPass;
use crate::renderer::texture::Texture;

/// A compiled shader module. Shared between a root material and its
/// variant instances.
#[derive(Debug)]
pub struct Shader {
    key: String,
    id: ShaderId,
}

impl Shader {
    pub fn new(key: &str, id: ShaderId) -> Self {
        Self {
            key: key.to_string(),
            id,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn destroy(&self, device: &dyn RenderDevice) {
        device.destroy_shader(self.id);
    }
}

/// A compiled material: a shader, the textures it samples, and the render
/// pass its draws are grouped under.
///
/// Materials are identity-compared (`Arc::ptr_eq`) throughout the batcher.
/// A variant instance created through [`Material::create_instance`] keeps a
/// pointer to its root so draws submitted against the root still land in
/// the instance's groups.
#[derive(Debug)]
pub struct Material {
    key: String,
    shader: Arc<Shader>,
    render_pass: Arc<RenderPass>,
    textures: Vec<Arc<Texture>>,
    root: Option<Arc<Material>>,
}

impl Material {
    pub fn new(
        key: &str,
        shader: Arc<Shader>,
        render_pass: Arc<RenderPass>,
        textures: Vec<Arc<Texture>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            key: key.to_string(),
            shader,
            render_pass,
            textures,
            root: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    pub fn textures(&self) -> &[Arc<Texture>] {
        &self.textures
    }

    pub fn root(&self) -> Option<&Arc<Material>> {
        self.root.as_ref()
    }

    pub fn is_variant(&self) -> bool {
        self.root.is_some()
    }

    /// Creates a variant instance sharing this material's shader and render
    /// pass but sampling `textures` instead. The instance records `self` as
    /// its root.
    pub fn create_instance(self: &Arc<Self>, textures: Vec<Arc<Texture>>) -> Arc<Material> {
        Arc::new(Material {
            key: self.key.clone(),
            shader: self.shader.clone(),
            render_pass: self.render_pass.clone(),
            textures,
            root: Some(self.clone()),
        })
    }
}

/// Declarative material blueprint, authored as data. Compilation resolves
/// the named render pass and assets through the collaborators and uploads
/// the shader and textures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialData {
    pub name: String,
    pub shader: String,
    pub render_pass: String,
    #[serde(default)]
    pub textures: Vec<String>,
}

impl MaterialData {
    /// Compiles this blueprint into a [`Material`].
    ///
    /// Failure is all-or-nothing: any shader or texture already uploaded
    /// when a later step fails is destroyed before the error is returned,
    /// so a failed compile leaves no GPU residue and may be retried.
    pub fn compile(
        &self,
        assets: &dyn AssetDatabase,
        device: &dyn RenderDevice,
    ) -> Result<Arc<Material>, MaterialError> {
        let render_pass = assets.render_pass(&self.render_pass).ok_or_else(|| {
            MaterialError::UnknownRenderPass {
                material: self.name.clone(),
                render_pass: self.render_pass.clone(),
            }
        })?;
        let source = assets.shader_source(&self.shader).ok_or_else(|| {
            MaterialError::MissingAsset {
                material: self.name.clone(),
                asset: self.shader.clone(),
            }
        })?;
        let shader_id = device.create_shader(&self.shader, &source).map_err(|err| {
            MaterialError::ShaderCompile {
                material: self.name.clone(),
                details: err.to_string(),
            }
        })?;
        let shader = Arc::new(Shader::new(&self.shader, shader_id));

        let mut textures = Vec::with_capacity(self.textures.len());
        for key in &self.textures {
            let data = match assets.texture_data(key) {
                Some(data) => data,
                None => {
                    release_partial(device, &shader, &textures);
                    return Err(MaterialError::MissingAsset {
                        material: self.name.clone(),
                        asset: key.clone(),
                    });
                }
            };
            let desc = TextureDescriptor {
                label: key.clone(),
                width: data.width,
                height: data.height,
                format: data.format,
            };
            match Texture::new(device, &desc, &data.pixels) {
                Ok(texture) => textures.push(texture),
                Err(err) => {
                    release_partial(device, &shader, &textures);
                    return Err(err.into());
                }
            }
        }

        Ok(Material::new(&self.name, shader, render_pass, textures))
    }
}

fn release_partial(device: &dyn RenderDevice, shader: &Shader, textures: &[Arc<Texture>]) {
    for texture in textures.iter().rev() {
        texture.destroy(device);
    }
    shader.destroy(device);
}
