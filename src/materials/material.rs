// src/materials/material.rs
//! One draw call's worth of GPU state.
//!
//! # Features
//! - Uniform values keyed by name hash, textures keyed by channel usage
//! - Material properties mapped to uniforms, feature requests and render states
//! - Two-pass bind: explicit values first, then shader defaults for whatever is unset
//! - Environment/feature flags fed back into shader selection

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::gpu::GpuContext;
use crate::hash::{hash, HashValue};
use crate::materials::render_state::{
    BlendState, CullFace, CullState, DepthState, RenderFunction, StencilState,
};
use crate::materials::variant::{Variant, VariantMap};
use crate::shaders::shader::Shader;
use crate::shaders::snippets_selector::ShaderSelectionParams;
use crate::texture::{Texture, TextureUsageInfo};
use crate::uniform_data::{ShaderDataType, UniformData};

/// Reserved property: opaque (`true`) or alpha-blended (`false`).
pub const IS_OPAQUE: &str = "IsOpaque";
/// Reserved property: disables back-face culling when `true`.
pub const DOUBLE_SIDED: &str = "DoubleSided";

#[derive(Debug, Clone, Default)]
pub struct Material {
    shader: Option<Arc<Shader>>,
    uniforms: BTreeMap<HashValue, UniformData>,
    textures: BTreeMap<TextureUsageInfo, Arc<Texture>>,
    requested_features: BTreeSet<HashValue>,
    blend_state: Option<BlendState>,
    depth_state: Option<DepthState>,
    cull_state: Option<CullState>,
    stencil_state: Option<StencilState>,
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shader(shader: Arc<Shader>) -> Self {
        Self {
            shader: Some(shader),
            ..Self::default()
        }
    }

    // ---------- Shader ----------

    pub fn set_shader(&mut self, shader: Option<Arc<Shader>>) {
        self.shader = shader;
    }

    #[inline]
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }

    // ---------- Uniforms ----------

    /// Upserts the value for `name`.
    pub fn set_uniform(&mut self, name: HashValue, data_type: ShaderDataType, bytes: &[u8]) {
        self.uniforms
            .entry(name)
            .or_insert_with(|| UniformData::new(data_type))
            .set_data(data_type, bytes);
    }

    pub fn set_uniform_values<T: bytemuck::Pod>(
        &mut self,
        name: HashValue,
        data_type: ShaderDataType,
        values: &[T],
    ) {
        self.set_uniform(name, data_type, bytemuck::cast_slice(values));
    }

    #[inline]
    pub fn uniform(&self, name: HashValue) -> Option<&UniformData> {
        self.uniforms.get(&name)
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (HashValue, &UniformData)> + '_ {
        self.uniforms.iter().map(|(name, data)| (*name, data))
    }

    /// Copies the leading `out.len()` bytes of `name`. Fails without writing when the
    /// uniform is unset or holds fewer bytes.
    pub fn read_uniform_data(&self, name: HashValue, out: &mut [u8]) -> bool {
        let Some(uniform) = self.uniforms.get(&name) else {
            return false;
        };
        let bytes = uniform.as_bytes();
        if out.len() > bytes.len() {
            return false;
        }
        out.copy_from_slice(&bytes[..out.len()]);
        true
    }

    /// Sets every uniform of `other` on this material.
    pub fn copy_uniforms(&mut self, other: &Material) {
        for (&name, data) in &other.uniforms {
            self.set_uniform(name, data.data_type(), data.as_bytes());
        }
    }

    // ---------- Textures ----------

    /// The material only keeps a reference; the texture cache owns the resource.
    pub fn set_texture(&mut self, usage: TextureUsageInfo, texture: Arc<Texture>) {
        self.textures.insert(usage, texture);
    }

    pub fn clear_texture(&mut self, usage: &TextureUsageInfo) -> Option<Arc<Texture>> {
        self.textures.remove(usage)
    }

    #[inline]
    pub fn texture(&self, usage: &TextureUsageInfo) -> Option<&Arc<Texture>> {
        self.textures.get(usage)
    }

    // ---------- Properties ----------

    /// Applies a property bag.
    ///
    /// `IsOpaque` and `DoubleSided` set render state. Numeric properties become
    /// uniforms, `bool` properties become feature requests and strings are ignored.
    pub fn apply_properties(&mut self, properties: &VariantMap) {
        let is_opaque = hash(IS_OPAQUE);
        let double_sided = hash(DOUBLE_SIDED);

        if let Some(opaque) = properties.get(&is_opaque) {
            if opaque.bool_or(true) {
                self.blend_state = Some(BlendState::DISABLED);
                self.depth_state = Some(DepthState {
                    test_enabled: true,
                    write_enabled: true,
                    function: RenderFunction::Less,
                });
            } else {
                self.blend_state = Some(BlendState::ALPHA);
                self.depth_state = Some(DepthState {
                    test_enabled: true,
                    write_enabled: false,
                    function: RenderFunction::Less,
                });
            }
        }

        if let Some(two_sided) = properties.get(&double_sided) {
            self.cull_state = Some(CullState {
                enabled: !two_sided.bool_or(false),
                face: CullFace::Back,
            });
        }

        for (&name, value) in properties {
            if name == is_opaque || name == double_sided {
                continue;
            }
            match value {
                Variant::Float(v) => self.set_uniform_values(name, ShaderDataType::Float1, &[*v]),
                Variant::Vec2(v) => {
                    self.set_uniform_values(name, ShaderDataType::Float2, &v.to_array())
                }
                Variant::Vec3(v) => {
                    self.set_uniform_values(name, ShaderDataType::Float3, &v.to_array())
                }
                Variant::Vec4(v) => {
                    self.set_uniform_values(name, ShaderDataType::Float4, &v.to_array())
                }
                Variant::Mat4(m) => {
                    self.set_uniform_values(name, ShaderDataType::Float4x4, &m.to_cols_array())
                }
                Variant::Int(v) => self.set_uniform_values(name, ShaderDataType::Int1, &[*v]),
                Variant::Bool(true) => self.request_feature(name),
                Variant::Bool(false) => self.clear_feature(name),
                Variant::String(_) => {}
            }
        }
    }

    // ---------- Binding ----------

    /// Pushes uniforms and textures to the shader's program. No-op without a shader.
    pub fn bind(&self, gpu: &mut dyn GpuContext) {
        let Some(shader) = self.shader.as_deref() else {
            return;
        };
        let program = shader.program();
        let max_units = gpu.max_texture_units();

        for (&name, data) in &self.uniforms {
            shader.bind_uniform(gpu, name, data);
        }

        for (usage, texture) in &self.textures {
            match shader.sampler_unit(usage) {
                Some(unit) if unit < max_units => {
                    gpu.bind_sampler(program, unit, Some(texture.handle()))
                }
                Some(_) => log::error!("Invalid unit for texture: {}", texture.name()),
                None => log::debug!("{} has no sampler for {}", shader.shading_model(), usage),
            }
        }

        for (name, data) in shader.defaults() {
            if !self.uniforms.contains_key(&name) {
                shader.bind_uniform(gpu, name, data);
            }
        }

        for sampler in shader.samplers() {
            if !self.textures.contains_key(&sampler.usage) && sampler.unit < max_units {
                gpu.bind_sampler(program, sampler.unit, None);
            }
        }
    }

    /// A shader is set and every referenced texture is resident.
    pub fn is_loaded(&self) -> bool {
        self.shader.is_some() && self.textures.values().all(|texture| texture.is_loaded())
    }

    // ---------- Selection flags ----------

    pub fn request_feature(&mut self, feature: HashValue) {
        self.requested_features.insert(feature);
    }

    pub fn clear_feature(&mut self, feature: HashValue) {
        self.requested_features.remove(&feature);
    }

    #[inline]
    pub fn is_feature_requested(&self, feature: HashValue) -> bool {
        self.requested_features.contains(&feature)
    }

    /// Adds the explicitly requested features.
    pub fn add_feature_flags(&self, flags: &mut BTreeSet<HashValue>) {
        flags.extend(self.requested_features.iter().copied());
    }

    /// Adds the usage hash of every bound texture and the name hash of every set uniform.
    pub fn add_environment_flags(&self, flags: &mut BTreeSet<HashValue>) {
        flags.extend(self.textures.keys().map(|usage| usage.hash()));
        flags.extend(self.uniforms.keys().copied());
    }

    /// `base` extended with this material's flags.
    pub fn selection_params(&self, base: &ShaderSelectionParams) -> ShaderSelectionParams {
        let mut params = base.clone();
        self.add_environment_flags(&mut params.environment);
        self.add_feature_flags(&mut params.features);
        params
    }

    // ---------- Render state ----------

    pub fn set_blend_state(&mut self, state: Option<BlendState>) {
        self.blend_state = state;
    }

    pub fn blend_state(&self) -> Option<&BlendState> {
        self.blend_state.as_ref()
    }

    pub fn set_depth_state(&mut self, state: Option<DepthState>) {
        self.depth_state = state;
    }

    pub fn depth_state(&self) -> Option<&DepthState> {
        self.depth_state.as_ref()
    }

    pub fn set_cull_state(&mut self, state: Option<CullState>) {
        self.cull_state = state;
    }

    pub fn cull_state(&self) -> Option<&CullState> {
        self.cull_state.as_ref()
    }

    pub fn set_stencil_state(&mut self, state: Option<StencilState>) {
        self.stencil_state = state;
    }

    pub fn stencil_state(&self) -> Option<&StencilState> {
        self.stencil_state.as_ref()
    }
}
