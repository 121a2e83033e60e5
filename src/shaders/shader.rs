// src/shaders/shader.rs
//! A linked program plus the interface it was built from.
//!
//! # Features
//! - Sampler units assigned in declaration order
//! - Uniform blocks (`BufferObject` uniforms) bound through the block path
//! - Declared default values decoded once, at construction

use std::collections::BTreeSet;

use crate::gpu::{GpuContext, ProgramHandle};
use crate::hash::{hash, HashValue};
use crate::shaders::description::ShaderDescription;
use crate::texture::TextureUsageInfo;
use crate::uniform_data::{ShaderDataType, UniformData};

/// Sampler binding point of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSampler {
    pub name: HashValue,
    pub usage: TextureUsageInfo,
    pub unit: u32,
}

#[derive(Debug)]
pub struct Shader {
    program: ProgramHandle,
    description: ShaderDescription,
    samplers: Vec<ShaderSampler>,
    uniform_blocks: BTreeSet<HashValue>,
    defaults: Vec<(HashValue, UniformData)>,
}

impl Shader {
    pub fn new(program: ProgramHandle, description: ShaderDescription) -> Self {
        let samplers = description
            .samplers
            .iter()
            .zip(0u32..)
            .map(|(sampler, unit)| ShaderSampler {
                name: hash(&sampler.name),
                usage: sampler.usage_info(),
                unit,
            })
            .collect();

        let uniform_blocks = description
            .uniforms
            .iter()
            .filter(|uniform| uniform.data_type == ShaderDataType::BufferObject)
            .map(|uniform| hash(&uniform.name))
            .collect();

        let defaults = description
            .uniforms
            .iter()
            .filter_map(|uniform| uniform.default_data().map(|data| (hash(&uniform.name), data)))
            .collect();

        Self {
            program,
            description,
            samplers,
            uniform_blocks,
            defaults,
        }
    }

    #[inline]
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    #[inline]
    pub fn description(&self) -> &ShaderDescription {
        &self.description
    }

    #[inline]
    pub fn shading_model(&self) -> &str {
        &self.description.shading_model
    }

    #[inline]
    pub fn samplers(&self) -> &[ShaderSampler] {
        &self.samplers
    }

    pub fn sampler(&self, usage: &TextureUsageInfo) -> Option<&ShaderSampler> {
        self.samplers.iter().find(|sampler| sampler.usage == *usage)
    }

    pub fn sampler_unit(&self, usage: &TextureUsageInfo) -> Option<u32> {
        self.sampler(usage).map(|sampler| sampler.unit)
    }

    #[inline]
    pub fn is_uniform_block(&self, name: HashValue) -> bool {
        self.uniform_blocks.contains(&name)
    }

    pub fn default_value(&self, name: HashValue) -> Option<&UniformData> {
        self.defaults
            .iter()
            .find(|(default_name, _)| *default_name == name)
            .map(|(_, data)| data)
    }

    /// Declared defaults in declaration order.
    pub fn defaults(&self) -> impl Iterator<Item = (HashValue, &UniformData)> + '_ {
        self.defaults.iter().map(|(name, data)| (*name, data))
    }

    /// Uploads `data` through the block path when `name` is a uniform block.
    pub fn bind_uniform(&self, gpu: &mut dyn GpuContext, name: HashValue, data: &UniformData) {
        if self.is_uniform_block(name) {
            gpu.bind_uniform_block(self.program, name, data.as_bytes());
        } else {
            gpu.bind_uniform(self.program, name, data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuCall, HeadlessGpuContext};
    use crate::shaders::shader_def::{ShaderSamplerDef, ShaderUniformDef};
    use crate::texture::MaterialTextureUsage::*;

    fn description() -> ShaderDescription {
        let mut desc = ShaderDescription::new("pbr");
        desc.uniforms = vec![
            ShaderUniformDef::new("color", ShaderDataType::Float4).with_values(&[1.0; 4]),
            ShaderUniformDef::new("Roughness", ShaderDataType::Float1),
            ShaderUniformDef::new("Lights", ShaderDataType::BufferObject),
        ];
        desc.samplers = vec![
            ShaderSamplerDef::new("BaseColorMap", BaseColor),
            ShaderSamplerDef::per_channel("OrmMap", &[Occlusion, Roughness, Metallic]),
        ];
        desc
    }

    #[test]
    fn test_sampler_units_follow_declaration_order() {
        let shader = Shader::new(ProgramHandle(1), description());
        assert_eq!(shader.sampler_unit(&TextureUsageInfo::from(BaseColor)), Some(0));
        assert_eq!(
            shader.sampler_unit(&TextureUsageInfo::new(&[Occlusion, Roughness, Metallic])),
            Some(1)
        );
        assert_eq!(shader.sampler_unit(&TextureUsageInfo::from(Normal)), None);
        assert_eq!(shader.samplers()[1].name, hash("OrmMap"));
    }

    #[test]
    fn test_defaults_only_for_declared_values() {
        let shader = Shader::new(ProgramHandle(1), description());
        let color = shader.default_value(hash("color")).unwrap();
        assert_eq!(color.data::<f32>().unwrap(), &[1.0, 1.0, 1.0, 1.0]);
        assert!(shader.default_value(hash("Roughness")).is_none());
        assert_eq!(shader.defaults().count(), 1);
    }

    #[test]
    fn test_block_path() {
        let shader = Shader::new(ProgramHandle(7), description());
        let mut gpu = HeadlessGpuContext::default();
        let block = UniformData::from_bytes(ShaderDataType::BufferObject, &[1, 2, 3]);
        shader.bind_uniform(&mut gpu, hash("Lights"), &block);
        let roughness = UniformData::from_values(ShaderDataType::Float1, &[0.5f32]);
        shader.bind_uniform(&mut gpu, hash("Roughness"), &roughness);

        assert!(shader.is_uniform_block(hash("Lights")));
        assert_eq!(
            gpu.calls()[0],
            GpuCall::UniformBlock {
                program: ProgramHandle(7),
                name: hash("Lights"),
                bytes: vec![1, 2, 3],
            }
        );
        assert_eq!(
            gpu.uniform_value(ProgramHandle(7), hash("Roughness")),
            Some(roughness.as_bytes())
        );
    }
}
