// src/shaders/shader_def.rs
//! Parsed shader definitions: per-stage lists of snippets with their applicability
//! conditions and declared interface.
//!
//! Definitions are plain data, read-only once loaded and shared by every variant
//! selected from them. They can be built in code (`with_*` builders) or loaded from
//! the JSON form produced by the shader asset pipeline.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::hash::{hash, HashValue};
use crate::texture::{MaterialTextureUsage, TextureUsageInfo};
use crate::uniform_data::{ShaderDataType, UniformData};

/// Target shading language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderLanguage {
    #[serde(rename = "GLSL_ES", alias = "GlslEs")]
    GlslEs,
    #[serde(rename = "GLSL", alias = "Glsl")]
    Glsl,
    /// Versions written for GLSL ES, converted to whichever language is targeted.
    #[serde(rename = "GL_Compat", alias = "GlCompat")]
    GlCompat,
}

impl ShaderLanguage {
    /// Lowest version each language supports.
    pub const fn minimum_version(self) -> u32 {
        match self {
            ShaderLanguage::GlslEs | ShaderLanguage::GlCompat => 100,
            ShaderLanguage::Glsl => 110,
        }
    }
}

/// GLSL core ↔ GLSL ES version pairs (core, es).
const VERSION_MAP: [(u32, u32); 10] = [
    (110, 100),
    (120, 100),
    (130, 100),
    (140, 100),
    (150, 100),
    (330, 300),
    (400, 300),
    (410, 300),
    (420, 300),
    (430, 300),
];

/// Converts a `GlCompat` (GLSL ES numbered) version to `target`. 0 stays 0.
pub fn convert_version_from_compat(version: u32, target: ShaderLanguage) -> u32 {
    if version == 0 {
        return 0;
    }
    match target {
        ShaderLanguage::Glsl => VERSION_MAP
            .iter()
            .find(|&&(_, es)| es == version)
            .map_or(version, |&(core, _)| core),
        ShaderLanguage::GlslEs => {
            if version == 100 || version == 300 {
                version
            } else {
                crate::dfatal!("Unknown GL_Compat version: {}", version);
                0
            }
        }
        ShaderLanguage::GlCompat => version,
    }
}

/// Pipeline stage. Stages run in declaration order; fragment is the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderStageType {
    Vertex = 0,
    Fragment = 1,
}

impl ShaderStageType {
    pub const COUNT: usize = 2;
    pub const ALL: [ShaderStageType; Self::COUNT] =
        [ShaderStageType::Vertex, ShaderStageType::Fragment];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShaderStageType::Vertex => "Vertex",
            ShaderStageType::Fragment => "Fragment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexAttributeType {
    Scalar1f,
    Vec2f,
    Vec3f,
    Vec4f,
    Vec2us,
    Vec4us,
    Vec4ub,
}

impl VertexAttributeType {
    pub const fn glsl_name(self) -> &'static str {
        match self {
            VertexAttributeType::Scalar1f => "float",
            VertexAttributeType::Vec2f => "vec2",
            VertexAttributeType::Vec3f => "vec3",
            VertexAttributeType::Vec4f => "vec4",
            VertexAttributeType::Vec2us => "uvec2",
            VertexAttributeType::Vec4us => "uvec4",
            VertexAttributeType::Vec4ub => "bvec4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexAttributeUsage {
    Position,
    Color,
    TexCoord,
    Normal,
    Tangent,
    Orientation,
    BoneIndices,
    BoneWeights,
}

/// A vertex attribute or inter-stage varying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderAttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: VertexAttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<VertexAttributeUsage>,
}

impl ShaderAttributeDef {
    pub fn new(name: impl Into<String>, attribute_type: VertexAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: VertexAttributeUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Same type and usage (names are compared by the caller).
    pub fn matches(&self, other: &Self) -> bool {
        self.attribute_type == other.attribute_type && self.usage == other.usage
    }
}

/// A uniform declaration, optionally with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderUniformDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ShaderDataType,
    /// 0 for a single (non-array) value.
    #[serde(default)]
    pub array_size: u32,
    /// Struct members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ShaderUniformDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_int: Vec<i32>,
}

impl ShaderUniformDef {
    pub fn new(name: impl Into<String>, data_type: ShaderDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            array_size: 0,
            fields: Vec::new(),
            values: Vec::new(),
            values_int: Vec::new(),
        }
    }

    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_values(mut self, values: &[f32]) -> Self {
        self.values = values.to_vec();
        self
    }

    pub fn with_int_values(mut self, values: &[i32]) -> Self {
        self.values_int = values.to_vec();
        self
    }

    pub fn with_field(mut self, field: ShaderUniformDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Scalar components the default values must supply.
    pub fn expected_value_count(&self) -> usize {
        self.data_type.component_count() * (self.array_size.max(1) as usize)
    }

    /// Same type, array size and (recursively) fields. Defaults are not compared.
    pub fn matches(&self, other: &Self) -> bool {
        self.data_type == other.data_type
            && self.array_size == other.array_size
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(lhs, rhs)| lhs.matches(rhs))
    }

    /// Default value as uniform data, `None` when the declaration has no defaults.
    ///
    /// Float defaults on an int type are truncated. Int defaults on a non-int type
    /// are invalid and yield `None`.
    pub fn default_data(&self) -> Option<UniformData> {
        if !self.values_int.is_empty() {
            if !self.data_type.is_int() {
                log::error!("uniform {} has int defaults but type {:?}", self.name, self.data_type);
                return None;
            }
            Some(UniformData::from_values(self.data_type, &self.values_int))
        } else if self.values.is_empty() {
            None
        } else if self.data_type.is_int() {
            let ints: Vec<i32> = self.values.iter().map(|&value| value as i32).collect();
            Some(UniformData::from_values(self.data_type, &ints))
        } else {
            Some(UniformData::from_values(self.data_type, &self.values))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureTarget {
    #[default]
    Standard2d,
    CubeMap,
}

impl TextureTarget {
    pub const fn glsl_name(self) -> &'static str {
        match self {
            TextureTarget::Standard2d => "sampler2D",
            TextureTarget::CubeMap => "samplerCube",
        }
    }
}

/// A sampler declaration bound by texture usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderSamplerDef {
    pub name: String,
    #[serde(default)]
    pub usage: MaterialTextureUsage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usage_per_channel: Vec<MaterialTextureUsage>,
    #[serde(default, rename = "type")]
    pub texture_target: TextureTarget,
}

impl ShaderSamplerDef {
    pub fn new(name: impl Into<String>, usage: MaterialTextureUsage) -> Self {
        Self {
            name: name.into(),
            usage,
            usage_per_channel: Vec::new(),
            texture_target: TextureTarget::Standard2d,
        }
    }

    pub fn per_channel(name: impl Into<String>, usages: &[MaterialTextureUsage]) -> Self {
        Self {
            name: name.into(),
            usage: MaterialTextureUsage::Unused,
            usage_per_channel: usages.to_vec(),
            texture_target: TextureTarget::Standard2d,
        }
    }

    pub fn with_target(mut self, target: TextureTarget) -> Self {
        self.texture_target = target;
        self
    }

    /// Texture usage key this sampler binds.
    pub fn usage_info(&self) -> TextureUsageInfo {
        if self.usage_per_channel.is_empty() {
            TextureUsageInfo::from(self.usage)
        } else {
            TextureUsageInfo::new(&self.usage_per_channel)
        }
    }

    /// Same usage, per-channel usage and target.
    pub fn matches(&self, other: &Self) -> bool {
        self.usage == other.usage
            && self.usage_per_channel == other.usage_per_channel
            && self.texture_target == other.texture_target
    }
}

/// Version window of a snippet for one language. 0 means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSnippetVersionDef {
    pub lang: ShaderLanguage,
    #[serde(default)]
    pub min_version: u32,
    #[serde(default)]
    pub max_version: u32,
}

/// One optional fragment of stage source with its applicability conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSnippetDef {
    pub name: String,
    /// No entries means the snippet applies to every language and version.
    pub versions: Vec<ShaderSnippetVersionDef>,
    #[serde(deserialize_with = "deserialize_flags")]
    pub environment: Vec<HashValue>,
    #[serde(deserialize_with = "deserialize_flags")]
    pub features: Vec<HashValue>,
    /// Declarations and helper functions placed before the generated entry points.
    pub code: String,
    /// Body run from `main()`.
    pub main_code: String,
    pub inputs: Vec<ShaderAttributeDef>,
    pub outputs: Vec<ShaderAttributeDef>,
    pub uniforms: Vec<ShaderUniformDef>,
    pub samplers: Vec<ShaderSamplerDef>,
}

impl ShaderSnippetDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_version(
        mut self,
        lang: ShaderLanguage,
        min_version: u32,
        max_version: u32,
    ) -> Self {
        self.versions.push(ShaderSnippetVersionDef {
            lang,
            min_version,
            max_version,
        });
        self
    }

    pub fn with_environment(mut self, flags: &[&str]) -> Self {
        self.environment.extend(flags.iter().map(|flag| hash(flag)));
        self
    }

    pub fn with_features(mut self, flags: &[&str]) -> Self {
        self.features.extend(flags.iter().map(|flag| hash(flag)));
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_main(mut self, main_code: impl Into<String>) -> Self {
        self.main_code = main_code.into();
        self
    }

    pub fn with_input(mut self, input: ShaderAttributeDef) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: ShaderAttributeDef) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_uniform(mut self, uniform: ShaderUniformDef) -> Self {
        self.uniforms.push(uniform);
        self
    }

    pub fn with_sampler(mut self, sampler: ShaderSamplerDef) -> Self {
        self.samplers.push(sampler);
        self
    }

    /// Effective version window for `lang`.
    ///
    /// An entry for `lang` wins, then a converted `GlCompat` entry. A snippet without
    /// entries is unbounded; one whose entries name other languages only is `None`.
    pub fn version_for(&self, lang: ShaderLanguage) -> Option<ShaderSnippetVersionDef> {
        if self.versions.is_empty() {
            return Some(ShaderSnippetVersionDef {
                lang,
                min_version: 0,
                max_version: 0,
            });
        }
        if let Some(exact) = self.versions.iter().find(|v| v.lang == lang) {
            return Some(*exact);
        }
        self.versions
            .iter()
            .find(|v| v.lang == ShaderLanguage::GlCompat)
            .map(|compat| ShaderSnippetVersionDef {
                lang,
                min_version: convert_version_from_compat(compat.min_version, lang),
                max_version: convert_version_from_compat(compat.max_version, lang),
            })
    }

    /// Asset-pipeline preparation applied to loaded snippets.
    fn prepare(&mut self) -> Result<()> {
        for sampler in &self.samplers {
            crate::ensure!(
                sampler.usage == MaterialTextureUsage::Unused
                    || sampler.usage_per_channel.is_empty(),
                Error::InvalidShaderDef(format!(
                    "sampler {} in snippet {} has both usage and usage_per_channel",
                    sampler.name, self.name
                ))
            );
            let flag = sampler.usage_info().hash();
            if !self.environment.contains(&flag) {
                self.environment.push(flag);
            }
        }
        for uniform in &mut self.uniforms {
            prepare_uniform_defaults(uniform)
                .with_context(|| format!("snippet {}", self.name))?;
        }
        Ok(())
    }
}

/// Checks default counts and moves float defaults of int uniforms into `values_int`.
fn prepare_uniform_defaults(uniform: &mut ShaderUniformDef) -> Result<()> {
    let supplied = uniform.values.len().max(uniform.values_int.len());
    if supplied == 0 {
        return Ok(());
    }
    crate::ensure!(
        uniform.values.is_empty() || uniform.values_int.is_empty(),
        Error::InvalidShaderDef(format!("uniform {} has both float and int defaults", uniform.name))
    );
    crate::ensure!(
        uniform.values_int.is_empty() || uniform.data_type.is_int(),
        Error::InvalidShaderDef(format!(
            "uniform {} has values_int, but type {:?} is not an int type",
            uniform.name, uniform.data_type
        ))
    );
    if uniform.data_type == ShaderDataType::BufferObject {
        return Ok(());
    }
    crate::ensure!(
        supplied == uniform.expected_value_count(),
        Error::InvalidShaderDef(format!(
            "uniform {} of type {:?} has {} values, but expected {}",
            uniform.name,
            uniform.data_type,
            supplied,
            uniform.expected_value_count()
        ))
    );
    if uniform.data_type.is_int() && !uniform.values.is_empty() {
        uniform.values_int = uniform.values.drain(..).map(|value| value as i32).collect();
    }
    Ok(())
}

/// Snippets for one pipeline stage, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderStageDef {
    #[serde(rename = "type")]
    pub stage: ShaderStageType,
    #[serde(default)]
    pub snippets: Vec<ShaderSnippetDef>,
}

impl ShaderStageDef {
    pub fn new(stage: ShaderStageType) -> Self {
        Self {
            stage,
            snippets: Vec::new(),
        }
    }

    pub fn with_snippet(mut self, snippet: ShaderSnippetDef) -> Self {
        self.snippets.push(snippet);
        self
    }
}

/// A complete shader definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderDef {
    #[serde(default)]
    pub stages: Vec<ShaderStageDef>,
}

impl ShaderDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: ShaderStageDef) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage(&self, stage: ShaderStageType) -> Option<&ShaderStageDef> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Parses and prepares the JSON form of a definition.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut def: ShaderDef = serde_json::from_str(json).context("parsing shader definition")?;
        def.prepare()?;
        Ok(def)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let mut def: ShaderDef =
            serde_json::from_value(value).context("parsing shader definition")?;
        def.prepare()?;
        Ok(def)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading shader definition {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("loading {}", path.display()))
    }

    fn prepare(&mut self) -> Result<()> {
        for stage in &mut self.stages {
            for snippet in &mut stage.snippets {
                snippet.prepare()?;
            }
        }
        Ok(())
    }
}

/// Flags may be written as names (hashed on load) or as raw hash values.
fn deserialize_flags<'de, D>(deserializer: D) -> std::result::Result<Vec<HashValue>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Hash(HashValue),
        Name(String),
    }

    let flags = Vec::<Flag>::deserialize(deserializer)?;
    Ok(flags
        .into_iter()
        .map(|flag| match flag {
            Flag::Hash(value) => value,
            Flag::Name(name) => hash(&name),
        })
        .collect())
}
