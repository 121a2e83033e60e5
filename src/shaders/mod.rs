// src/shaders/mod.rs
//! Shader definitions, variant selection and program construction.
//!
//! Flow: [`ShaderDef`] + [`ShaderSelectionParams`] → [`select_shader_snippets`] →
//! [`generate_stage_source`] per stage → [`ShaderFactory`] compiles and caches a [`Shader`].

pub mod description;
pub mod shader;
pub mod shader_def;
pub mod shader_factory;
pub mod shader_source;
pub mod snippets_selector;

pub use description::{ShaderDescription, ShaderDescriptionBuilder};
pub use shader::{Shader, ShaderSampler};
pub use shader_def::{
    ShaderAttributeDef, ShaderDef, ShaderLanguage, ShaderSamplerDef, ShaderSnippetDef,
    ShaderSnippetVersionDef, ShaderStageDef, ShaderStageType, ShaderUniformDef, TextureTarget,
    VertexAttributeType, VertexAttributeUsage,
};
pub use shader_factory::ShaderFactory;
pub use shader_source::generate_stage_source;
pub use snippets_selector::{
    create_shader_description, select_shader_snippets, validate_and_add_attribute_def,
    validate_and_add_sampler_def, validate_and_add_uniform_def, MainBlock, SelectedStage,
    ShaderSelectionParams, SnippetSelectionResult,
};
