// src/shaders/description.rs
//! Program-wide shader interface.
//!
//! A [`ShaderDescription`] lists every uniform, sampler and vertex attribute a linked
//! program exposes. It comes either from snippet selection or, for the built-in
//! shading models, from [`ShaderDescriptionBuilder`].

use crate::hash::{hash, HashValue};
use crate::shaders::shader_def::{
    ShaderAttributeDef, ShaderSamplerDef, ShaderUniformDef, TextureTarget, VertexAttributeType,
    VertexAttributeUsage,
};
use crate::shaders::snippets_selector::ShaderSelectionParams;
use crate::texture::{MaterialTextureUsage, TextureUsageInfo};
use crate::uniform_data::ShaderDataType;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderDescription {
    pub shading_model: String,
    pub uniforms: Vec<ShaderUniformDef>,
    pub samplers: Vec<ShaderSamplerDef>,
    pub attributes: Vec<ShaderAttributeDef>,
}

impl ShaderDescription {
    pub fn new(shading_model: impl Into<String>) -> Self {
        Self {
            shading_model: shading_model.into(),
            ..Self::default()
        }
    }

    pub fn uniform(&self, name: HashValue) -> Option<&ShaderUniformDef> {
        self.uniforms.iter().find(|uniform| hash(&uniform.name) == name)
    }

    #[inline]
    pub fn has_uniform(&self, name: HashValue) -> bool {
        self.uniform(name).is_some()
    }

    #[inline]
    pub fn has_sampler(&self, name: HashValue) -> bool {
        self.samplers.iter().any(|sampler| hash(&sampler.name) == name)
    }

    #[inline]
    pub fn has_attribute(&self, name: HashValue) -> bool {
        self.attributes.iter().any(|attribute| hash(&attribute.name) == name)
    }
}

/// Builds descriptions for the built-in shading models from selection flags.
#[derive(Debug, Default)]
pub struct ShaderDescriptionBuilder {
    description: ShaderDescription,
}

impl ShaderDescriptionBuilder {
    pub fn new(shading_model: impl Into<String>) -> Self {
        Self {
            description: ShaderDescription::new(shading_model),
        }
    }

    /// Default interface for `shading_model` under `params`.
    ///
    /// `color` is always present. Other uniforms, samplers and attributes appear
    /// when their flag is set in either the features or the environment.
    pub fn from_params(
        shading_model: impl Into<String>,
        params: &ShaderSelectionParams,
    ) -> ShaderDescription {
        use MaterialTextureUsage::{
            BaseColor, Emissive, Metallic, Normal, Occlusion, Roughness, Unused,
        };

        let has = |flag: HashValue| {
            params.features.contains(&flag) || params.environment.contains(&flag)
        };
        let mut builder = Self::new(shading_model);

        builder.add_uniform("color", ShaderDataType::Float4);
        for (name, data_type) in [
            ("BaseColor", ShaderDataType::Float4),
            ("Emissive", ShaderDataType::Float4),
            ("Metallic", ShaderDataType::Float1),
            ("Roughness", ShaderDataType::Float1),
            ("Smoothness", ShaderDataType::Float1),
            ("Occlusion", ShaderDataType::Float1),
        ] {
            if has(hash(name)) {
                builder.add_uniform(name, data_type);
            }
        }

        let samplers = [
            ("BaseColorMap", TextureUsageInfo::from(BaseColor)),
            ("NormalMap", TextureUsageInfo::from(Normal)),
            ("EmissiveMap", TextureUsageInfo::from(Emissive)),
            ("OcclusionMap", TextureUsageInfo::from(Occlusion)),
            ("RoughnessMetallicMap", TextureUsageInfo::new(&[Unused, Roughness, Metallic])),
            ("OrmMap", TextureUsageInfo::new(&[Occlusion, Roughness, Metallic])),
        ];
        for (name, usage) in samplers {
            if has(usage.hash()) {
                builder.add_sampler(name, usage);
            }
        }

        use VertexAttributeType::{Vec2f, Vec3f, Vec4ub};
        let attributes = [
            ("Transform", "Transform", Vec3f, VertexAttributeUsage::Position),
            ("VertexColor", "VertexColor", Vec4ub, VertexAttributeUsage::Color),
            ("Texture", "Texture", Vec2f, VertexAttributeUsage::TexCoord),
            ("Texture1", "Texture1", Vec2f, VertexAttributeUsage::TexCoord),
            ("Skin", "BoneIndices", Vec4ub, VertexAttributeUsage::BoneIndices),
            ("Skin", "BoneWeights", Vec4ub, VertexAttributeUsage::BoneWeights),
        ];
        for (flag, name, attribute_type, usage) in attributes {
            if has(hash(flag)) {
                builder.add_attribute(name, attribute_type, usage);
            }
        }

        builder.build()
    }

    pub fn add_uniform(&mut self, name: &str, data_type: ShaderDataType) -> &mut Self {
        self.description.uniforms.push(ShaderUniformDef::new(name, data_type));
        self
    }

    /// Single-usage samplers use the `usage` form; anything with a used channel past
    /// the first is declared per channel, without trailing `Unused` channels.
    pub fn add_sampler(&mut self, name: &str, usage: TextureUsageInfo) -> &mut Self {
        let single = (1..TextureUsageInfo::MAX_CHANNELS)
            .all(|i| usage.channel_usage(i) == MaterialTextureUsage::Unused);
        let sampler = if single {
            ShaderSamplerDef::new(name, usage.channel_usage(0))
        } else {
            ShaderSamplerDef::per_channel(name, usage.used_channels())
        };
        self.description.samplers.push(sampler.with_target(TextureTarget::Standard2d));
        self
    }

    pub fn add_attribute(
        &mut self,
        name: &str,
        attribute_type: VertexAttributeType,
        usage: VertexAttributeUsage,
    ) -> &mut Self {
        self.description
            .attributes
            .push(ShaderAttributeDef::new(name, attribute_type).with_usage(usage));
        self
    }

    pub fn build(self) -> ShaderDescription {
        self.description
    }
}
