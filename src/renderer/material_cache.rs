use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::renderer::assets::AssetDatabase;
use crate::renderer::device::RenderDevice;
use crate::renderer::error::MaterialError;
use crate::renderer::material::{Material, MaterialData};

/// Deduplicates compiled materials by key and tracks which of them still
/// await their GPU upload pass.
///
/// A material is compiled at most once per key; repeat requests return the
/// cached instance. A failed compile caches nothing, so retrying against a
/// fixed blueprint recompiles.
pub struct MaterialCache {
    device: Arc<dyn RenderDevice>,
    assets: Arc<dyn AssetDatabase>,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    materials: HashMap<String, Arc<Material>>,
    pending: Vec<Arc<Material>>,
}

impl MaterialCache {
    pub fn new(device: Arc<dyn RenderDevice>, assets: Arc<dyn AssetDatabase>) -> Self {
        Self {
            device,
            assets,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Registers an externally compiled material. The first registration of
    /// a key adopts the material and marks it pending-for-upload; repeats
    /// are no-ops that return the canonical cached instance.
    pub fn add_compiled(&self, material: Arc<Material>) -> Arc<Material> {
        let mut inner = self.inner.lock().unwrap();
        match inner.materials.get(material.key()) {
            Some(found) => found.clone(),
            None => {
                inner
                    .materials
                    .insert(material.key().to_string(), material.clone());
                inner.pending.push(material.clone());
                material
            }
        }
    }

    /// Looks up `data.name`, compiling on a miss. Compile failures are
    /// returned to the caller and cache nothing.
    pub fn material(&self, data: &MaterialData) -> Result<Arc<Material>, MaterialError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(found) = inner.materials.get(&data.name) {
            return Ok(found.clone());
        }
        let material = data.compile(self.assets.as_ref(), self.device.as_ref())?;
        inner
            .materials
            .insert(data.name.clone(), material.clone());
        inner.pending.push(material.clone());
        Ok(material)
    }

    /// Pure lookup; never compiles.
    pub fn find(&self, key: &str) -> Option<Arc<Material>> {
        self.inner.lock().unwrap().materials.get(key).cloned()
    }

    /// Hands the pending-for-upload list to the frame driver, leaving it
    /// empty.
    pub fn take_pending(&self) -> Vec<Arc<Material>> {
        std::mem::take(&mut self.inner.lock().unwrap().pending)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().materials.is_empty()
    }
}
