// src/shaders/shader_factory.rs
//! Builds programs from shader definitions and caches them per variant.
//!
//! # Features
//! - Variant key: `hash(shading_model)` XOR every environment and feature flag
//! - Bounded LRU cache; an evicted program is released once nothing else holds it
//! - Vertex and fragment stages are both mandatory
//! - Bound to the creating thread (checked in debug builds)

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use lru::LruCache;
use parking_lot::Mutex;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::hash::{hash, HashValue};
use crate::shaders::description::ShaderDescription;
use crate::shaders::shader::Shader;
use crate::shaders::shader_def::{
    ShaderAttributeDef, ShaderDef, ShaderStageType, ShaderUniformDef, VertexAttributeType,
    VertexAttributeUsage,
};
use crate::shaders::shader_source::generate_stage_source;
use crate::shaders::snippets_selector::{
    create_shader_description, select_shader_snippets, ShaderSelectionParams,
};
use crate::uniform_data::ShaderDataType;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

const FALLBACK_VERTEX_SOURCE: &str = "attribute vec4 aPosition;\n\
    uniform mat4 model_view_projection;\n\
    void main() {\n  gl_Position = model_view_projection * aPosition;\n}\n";

const FALLBACK_FRAGMENT_SOURCE: &str = "uniform lowp vec4 color;\n\
    void main() {\n  gl_FragColor = vec4(color.rgb * color.a, color.a);\n}\n";

pub struct ShaderFactory {
    shaders: Mutex<LruCache<HashValue, Arc<Shader>>>,
    owner: ThreadId,
}

impl Default for ShaderFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for ShaderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderFactory")
            .field("cached", &self.shaders.lock().len())
            .finish()
    }
}

impl ShaderFactory {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            shaders: Mutex::new(LruCache::new(capacity)),
            owner: thread::current().id(),
        }
    }

    /// Cache key of a variant.
    pub fn shader_key(shading_model: &str, params: &ShaderSelectionParams) -> HashValue {
        params
            .environment
            .iter()
            .chain(params.features.iter())
            .fold(hash(shading_model), |key, flag| key ^ flag)
    }

    /// Cached variant for `params`, building and caching it on a miss.
    pub fn load_shader(
        &self,
        shading_model: &str,
        def: &ShaderDef,
        params: &ShaderSelectionParams,
        gpu: &mut dyn GpuContext,
    ) -> Result<Arc<Shader>> {
        let key = Self::shader_key(shading_model, params);
        if let Some(shader) = self.cached_shader(key) {
            return Ok(shader);
        }
        let shader = self.load_shader_from_def(shading_model, def, params, gpu)?;
        self.cache_shader(key, Arc::clone(&shader), gpu);
        Ok(shader)
    }

    /// Selects, generates and compiles one variant. Not cached.
    pub fn load_shader_from_def(
        &self,
        shading_model: &str,
        def: &ShaderDef,
        params: &ShaderSelectionParams,
        gpu: &mut dyn GpuContext,
    ) -> Result<Arc<Shader>> {
        self.check_thread();

        let selection = select_shader_snippets(def, params)
            .with_context(|| format!("selecting snippets for {}", shading_model))?;
        for stage in ShaderStageType::ALL {
            if selection.stage(stage).is_empty() {
                log::error!("Shader must have a {} stage.", stage.name().to_lowercase());
                return Err(Error::MissingStage(stage));
            }
        }
        let description = create_shader_description(shading_model, &selection)?;

        let [vertex, fragment] = ShaderStageType::ALL.map(|stage| {
            generate_stage_source(
                stage,
                selection.stage(stage),
                params.lang,
                selection.shader_version,
            )
        });
        let program = gpu
            .compile_program(&vertex, &fragment)
            .with_context(|| format!("compiling {}", shading_model))?;

        log::debug!(
            "built shader {} (version {}, program {:?})",
            shading_model,
            selection.shader_version,
            program
        );
        Ok(Arc::new(Shader::new(program, description)))
    }

    /// Minimal flat-color program used when a definition cannot be built.
    pub fn load_fallback_shader(&self, gpu: &mut dyn GpuContext) -> Result<Arc<Shader>> {
        self.check_thread();
        let program = gpu
            .compile_program(FALLBACK_VERTEX_SOURCE, FALLBACK_FRAGMENT_SOURCE)
            .context("compiling fallback shader")?;

        let mut description = ShaderDescription::new("fallback");
        description.uniforms = vec![
            ShaderUniformDef::new("model_view_projection", ShaderDataType::Float4x4),
            ShaderUniformDef::new("color", ShaderDataType::Float4),
        ];
        description.attributes = vec![
            ShaderAttributeDef::new("aPosition", VertexAttributeType::Vec4f)
                .with_usage(VertexAttributeUsage::Position),
        ];
        Ok(Arc::new(Shader::new(program, description)))
    }

    pub fn cached_shader(&self, key: HashValue) -> Option<Arc<Shader>> {
        self.check_thread();
        self.shaders.lock().get(&key).cloned()
    }

    /// Inserts or replaces the entry for `key`.
    pub fn cache_shader(&self, key: HashValue, shader: Arc<Shader>, gpu: &mut dyn GpuContext) {
        self.check_thread();
        let displaced = self.shaders.lock().push(key, shader);
        if let Some((displaced_key, displaced)) = displaced {
            log::debug!("shader {:#010x} left the cache", displaced_key);
            release_if_unused(displaced, gpu);
        }
    }

    /// Drops the cache entry for `key`. The program is released if no material still uses it.
    pub fn release_shader(&self, key: HashValue, gpu: &mut dyn GpuContext) {
        self.check_thread();
        let removed = self.shaders.lock().pop(&key);
        if let Some(shader) = removed {
            release_if_unused(shader, gpu);
        }
    }

    pub fn len(&self) -> usize {
        self.shaders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn check_thread(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "ShaderFactory used off the thread that created it"
        );
    }
}

fn release_if_unused(shader: Arc<Shader>, gpu: &mut dyn GpuContext) {
    if let Ok(shader) = Arc::try_unwrap(shader) {
        gpu.release_program(shader.program());
    }
}
