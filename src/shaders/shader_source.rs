// src/shaders/shader_source.rs
//! Stage source generation from a selected variant.
//!
//! Layout of a generated stage:
//! - `#version` line
//! - uniform and sampler declarations
//! - input and output declarations
//! - header code of every snippet
//! - one `GeneratedFunction<Stage><i>()` per main block
//! - `main()` calling the generated functions in order

use std::fmt::Write as _;

use crate::shaders::shader_def::{
    ShaderAttributeDef, ShaderLanguage, ShaderSamplerDef, ShaderStageType, ShaderUniformDef,
};
use crate::shaders::snippets_selector::SelectedStage;
use crate::uniform_data::ShaderDataType;

/// `#version` directive for `lang`, empty when `version` is 0.
pub fn version_line(lang: ShaderLanguage, version: u32) -> String {
    match (lang, version) {
        (_, 0) => String::new(),
        (ShaderLanguage::GlslEs, v) if v >= 300 => format!("#version {} es\n", v),
        (_, v) => format!("#version {}\n", v),
    }
}

#[inline]
pub fn generated_function_name(stage: ShaderStageType, index: usize) -> String {
    format!("GeneratedFunction{}{}", stage.name(), index)
}

/// Complete source of one stage. An empty stage yields only the version line.
pub fn generate_stage_source(
    stage: ShaderStageType,
    selected: &SelectedStage,
    lang: ShaderLanguage,
    version: u32,
) -> String {
    let mut out = version_line(lang, version);

    for uniform in &selected.uniforms {
        write_uniform(&mut out, uniform);
    }
    for sampler in &selected.samplers {
        write_sampler(&mut out, sampler);
    }
    for input in &selected.inputs {
        let qualifier = match stage {
            ShaderStageType::Vertex => "attribute",
            ShaderStageType::Fragment => "varying",
        };
        write_attribute(&mut out, qualifier, input);
    }
    for output in &selected.outputs {
        write_attribute(&mut out, "varying", output);
    }

    for code in &selected.code {
        push_line_terminated(&mut out, code);
    }

    for (index, block) in selected.main.iter().enumerate() {
        let _ = writeln!(out, "void {}() {{", generated_function_name(stage, index));
        push_line_terminated(&mut out, &block.code);
        out.push_str("}\n");
    }

    if !selected.main.is_empty() {
        out.push_str("\nvoid main() {\n");
        for index in 0..selected.main.len() {
            let _ = writeln!(out, "{}();", generated_function_name(stage, index));
        }
        out.push_str("}\n");
    }

    out
}

fn push_line_terminated(out: &mut String, code: &str) {
    out.push_str(code);
    if !code.ends_with('\n') {
        out.push('\n');
    }
}

fn write_uniform(out: &mut String, uniform: &ShaderUniformDef) {
    if uniform.data_type == ShaderDataType::BufferObject {
        let _ = writeln!(out, "layout(std140) uniform {} {{", uniform.name);
        for field in &uniform.fields {
            match field.data_type.glsl_name() {
                Some(glsl) => {
                    let size = array_suffix(field.array_size);
                    let _ = writeln!(out, "  {} {}{};", glsl, field.name, size);
                }
                None => crate::dfatal!(
                    "Unsupported field {} in uniform block {}",
                    field.name,
                    uniform.name
                ),
            }
        }
        out.push_str("};\n");
        return;
    }

    match uniform.data_type.glsl_name() {
        Some(glsl) => {
            let size = array_suffix(uniform.array_size);
            let _ = writeln!(out, "uniform {} {}{};", glsl, uniform.name, size);
        }
        None => crate::dfatal!(
            "Unsupported uniform type {:?} for {}",
            uniform.data_type,
            uniform.name
        ),
    }
}

fn array_suffix(array_size: u32) -> String {
    if array_size == 0 {
        String::new()
    } else {
        format!("[{}]", array_size)
    }
}

fn write_sampler(out: &mut String, sampler: &ShaderSamplerDef) {
    let _ = writeln!(out, "uniform {} {};", sampler.texture_target.glsl_name(), sampler.name);
}

fn write_attribute(out: &mut String, qualifier: &str, attribute: &ShaderAttributeDef) {
    let _ = writeln!(
        out,
        "{} {} {};",
        qualifier,
        attribute.attribute_type.glsl_name(),
        attribute.name
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::shader_def::{
        ShaderSnippetDef, ShaderStageDef, TextureTarget, VertexAttributeType,
    };
    use crate::shaders::shader_def::ShaderDef;
    use crate::shaders::snippets_selector::{
        select_shader_snippets, MainBlock, ShaderSelectionParams,
    };
    use crate::texture::MaterialTextureUsage;

    #[test]
    fn test_version_line() {
        assert_eq!(version_line(ShaderLanguage::GlslEs, 100), "#version 100\n");
        assert_eq!(version_line(ShaderLanguage::GlslEs, 300), "#version 300 es\n");
        assert_eq!(version_line(ShaderLanguage::Glsl, 330), "#version 330\n");
        assert_eq!(version_line(ShaderLanguage::Glsl, 0), "");
    }

    #[test]
    fn test_fragment_layout() {
        let stage = SelectedStage {
            inputs: vec![ShaderAttributeDef::new("vColor", VertexAttributeType::Vec4f)],
            uniforms: vec![
                ShaderUniformDef::new("color", ShaderDataType::Float4),
                ShaderUniformDef::new("bones", ShaderDataType::Float4).with_array_size(3),
            ],
            samplers: vec![ShaderSamplerDef::new("env", MaterialTextureUsage::Reflection)
                .with_target(TextureTarget::CubeMap)],
            code: vec!["precision mediump float;".into()],
            main: vec![
                MainBlock {
                    snippet: "flat".into(),
                    code: "gl_FragColor = color;".into(),
                },
                MainBlock {
                    snippet: "tint".into(),
                    code: "gl_FragColor *= vColor;\n".into(),
                },
            ],
            ..SelectedStage::default()
        };

        let source =
            generate_stage_source(ShaderStageType::Fragment, &stage, ShaderLanguage::GlslEs, 100);
        let expected = "#version 100\n\
            uniform vec4 color;\n\
            uniform vec4 bones[3];\n\
            uniform samplerCube env;\n\
            varying vec4 vColor;\n\
            precision mediump float;\n\
            void GeneratedFunctionFragment0() {\n\
            gl_FragColor = color;\n\
            }\n\
            void GeneratedFunctionFragment1() {\n\
            gl_FragColor *= vColor;\n\
            }\n\
            \n\
            void main() {\n\
            GeneratedFunctionFragment0();\n\
            GeneratedFunctionFragment1();\n\
            }\n";
        assert_eq!(source, expected);
    }

    #[test]
    fn test_vertex_qualifiers() {
        let stage = SelectedStage {
            inputs: vec![ShaderAttributeDef::new("aPosition", VertexAttributeType::Vec3f)],
            outputs: vec![ShaderAttributeDef::new("vUv", VertexAttributeType::Vec2f)],
            ..SelectedStage::default()
        };
        let source =
            generate_stage_source(ShaderStageType::Vertex, &stage, ShaderLanguage::Glsl, 0);
        assert_eq!(source, "attribute vec3 aPosition;\nvarying vec2 vUv;\n");
    }

    #[test]
    fn test_uniform_block() {
        let stage = SelectedStage {
            uniforms: vec![ShaderUniformDef::new("Lights", ShaderDataType::BufferObject)
                .with_field(ShaderUniformDef::new("direction", ShaderDataType::Float3))
                .with_field(
                    ShaderUniformDef::new("colors", ShaderDataType::Float4).with_array_size(2),
                )],
            ..SelectedStage::default()
        };
        let source =
            generate_stage_source(ShaderStageType::Fragment, &stage, ShaderLanguage::GlslEs, 300);
        assert_eq!(
            source,
            "#version 300 es\nlayout(std140) uniform Lights {\n  vec3 direction;\n  vec4 colors[2];\n};\n"
        );
    }

    #[test]
    fn test_generates_from_selection() {
        let def = ShaderDef::new().with_stage(
            ShaderStageDef::new(ShaderStageType::Vertex)
                .with_snippet(ShaderSnippetDef::new("pos").with_main("gl_Position = vec4(0.0);")),
        );
        let params = ShaderSelectionParams::default();
        let result = select_shader_snippets(&def, &params).unwrap();
        let source = generate_stage_source(
            ShaderStageType::Vertex,
            result.stage(ShaderStageType::Vertex),
            params.lang,
            result.shader_version,
        );
        assert!(source.starts_with("#version 100\n"));
        assert!(
            source.contains("void GeneratedFunctionVertex0() {\ngl_Position = vec4(0.0);\n}\n")
        );
        assert!(source.ends_with("void main() {\nGeneratedFunctionVertex0();\n}\n"));
    }
}
