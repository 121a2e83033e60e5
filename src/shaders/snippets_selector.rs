// src/shaders/snippets_selector.rs
//! Shader variant selection.
//!
//! Picks, per stage, the snippets of a [`ShaderDef`] that apply to a selection
//! context, fixes the shader version, checks that stage interfaces line up, and
//! merges every selected declaration into one list per stage. Merging rejects
//! same-named declarations that disagree; it never keeps one of them silently.
//!
//! Selection is deterministic: snippets keep declaration order and every set is
//! ordered.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::hash::{hash, HashValue};
use crate::shaders::description::ShaderDescription;
use crate::shaders::shader_def::{
    ShaderAttributeDef, ShaderDef, ShaderLanguage, ShaderSamplerDef, ShaderSnippetDef,
    ShaderStageType, ShaderUniformDef,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Section 1 — Selection inputs and outputs
// ═══════════════════════════════════════════════════════════════════════════════

/// What the variant is being selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSelectionParams {
    pub lang: ShaderLanguage,
    /// 0 means no cap.
    pub max_shader_version: u32,
    /// Platform/runtime capabilities.
    pub environment: BTreeSet<HashValue>,
    /// Material-requested options.
    pub features: BTreeSet<HashValue>,
}

impl Default for ShaderSelectionParams {
    fn default() -> Self {
        Self::new(ShaderLanguage::GlslEs)
    }
}

impl ShaderSelectionParams {
    pub fn new(lang: ShaderLanguage) -> Self {
        Self {
            lang,
            max_shader_version: 0,
            environment: BTreeSet::new(),
            features: BTreeSet::new(),
        }
    }

    pub fn with_max_version(mut self, max_shader_version: u32) -> Self {
        self.max_shader_version = max_shader_version;
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
}

/// A main-body block and the snippet it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainBlock {
    pub snippet: String,
    pub code: String,
}

/// Merged interface and ordered code of one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedStage {
    pub inputs: Vec<ShaderAttributeDef>,
    pub outputs: Vec<ShaderAttributeDef>,
    pub uniforms: Vec<ShaderUniformDef>,
    pub samplers: Vec<ShaderSamplerDef>,
    pub snippet_names: Vec<String>,
    /// Header code, in snippet order.
    pub code: Vec<String>,
    /// Main-body blocks, in snippet order.
    pub main: Vec<MainBlock>,
}

impl SelectedStage {
    /// True when no snippet contributed code to this stage.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.main.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetSelectionResult {
    pub shader_version: u32,
    pub stages: [SelectedStage; ShaderStageType::COUNT],
}

impl SnippetSelectionResult {
    #[inline]
    pub fn stage(&self, stage: ShaderStageType) -> &SelectedStage {
        &self.stages[stage.index()]
    }
}

type StageSnippets<'a> = [Vec<&'a ShaderSnippetDef>; ShaderStageType::COUNT];

// ═══════════════════════════════════════════════════════════════════════════════
// Section 2 — Selection
// ═══════════════════════════════════════════════════════════════════════════════

/// Selects and merges the snippets of `def` for `params`.
///
/// A stage with no applicable snippet comes back empty; deciding whether that is
/// fatal is up to the caller. Conflicting declarations fail the whole selection.
pub fn select_shader_snippets(
    def: &ShaderDef,
    params: &ShaderSelectionParams,
) -> Result<SnippetSelectionResult> {
    let mut snippets: StageSnippets<'_> = Default::default();
    for stage in &def.stages {
        snippets[stage.stage.index()]
            .extend(stage.snippets.iter().filter(|s| is_applicable(s, params)));
    }

    let shader_version = find_highest_minimum_version(&snippets, params);
    remove_unsupported_snippets(&mut snippets, shader_version, params);

    if log::log_enabled!(log::Level::Trace) {
        log::trace!("{}", describe_selection(def, params, &snippets));
    }

    let mut result = SnippetSelectionResult {
        shader_version,
        ..Default::default()
    };

    let mut first_nonempty_stage = true;
    for stage_type in ShaderStageType::ALL {
        let index = stage_type.index();
        let (before, rest) = snippets.split_at_mut(index);
        let Some((current, after)) = rest.split_first_mut() else {
            continue;
        };
        let previous = before.last();
        let next = after.first();

        current.retain(|snippet| {
            if !first_nonempty_stage {
                if let Some(previous) = previous {
                    if !inputs_included(snippet, previous) {
                        log::debug!(
                            "dropping {}: inputs not produced by previous stage",
                            snippet.name
                        );
                        return false;
                    }
                }
            }
            if let Some(next) = next {
                if !outputs_included(snippet, next) {
                    log::debug!("dropping {}: outputs not consumed by next stage", snippet.name);
                    return false;
                }
            }
            true
        });
        if !current.is_empty() {
            first_nonempty_stage = false;
        }

        let selected = &mut result.stages[index];
        for snippet in current.iter() {
            gather(snippet, selected)
                .with_context(|| format!("{} stage, snippet {}", stage_type.name(), snippet.name))?;
        }
    }

    Ok(result)
}

fn is_subset(subset: &[HashValue], superset: &BTreeSet<HashValue>) -> bool {
    subset.iter().all(|flag| superset.contains(flag))
}

fn is_applicable(snippet: &ShaderSnippetDef, params: &ShaderSelectionParams) -> bool {
    snippet.version_for(params.lang).is_some()
        && is_subset(&snippet.environment, &params.environment)
        && is_subset(&snippet.features, &params.features)
}

/// Highest snippet minimum version within the cap, never below the language minimum.
fn find_highest_minimum_version(
    snippets: &StageSnippets<'_>,
    params: &ShaderSelectionParams,
) -> u32 {
    let cap = params.max_shader_version;
    let mut highest = params.lang.minimum_version();
    for snippet in snippets.iter().flatten() {
        let Some(version) = snippet.version_for(params.lang) else {
            continue;
        };
        if version.min_version > highest && (cap == 0 || version.min_version <= cap) {
            highest = version.min_version;
        }
    }
    highest
}

/// Drops snippets outside the version window and, per stage, snippets whose
/// features were already supplied by an earlier snippet.
fn remove_unsupported_snippets(
    snippets: &mut StageSnippets<'_>,
    version: u32,
    params: &ShaderSelectionParams,
) {
    for stage in snippets.iter_mut() {
        let mut features_to_support = params.features.clone();
        stage.retain(|snippet| {
            let Some(window) = snippet.version_for(params.lang) else {
                return false;
            };
            if window.min_version > version {
                return false;
            }
            if window.max_version != 0 && version > window.max_version {
                return false;
            }
            if !is_subset(&snippet.features, &features_to_support) {
                return false;
            }
            for feature in &snippet.features {
                features_to_support.remove(feature);
            }
            true
        });
    }
}

fn inputs_included(snippet: &ShaderSnippetDef, previous: &[&ShaderSnippetDef]) -> bool {
    snippet.inputs.iter().all(|input| {
        previous.iter().any(|other| {
            other.outputs.iter().any(|output| {
                output.name == input.name && output.attribute_type == input.attribute_type
            })
        })
    })
}

fn outputs_included(snippet: &ShaderSnippetDef, next: &[&ShaderSnippetDef]) -> bool {
    snippet.outputs.iter().all(|output| {
        next.iter().any(|other| {
            other.inputs.iter().any(|input| {
                input.name == output.name && input.attribute_type == output.attribute_type
            })
        })
    })
}

fn gather(snippet: &ShaderSnippetDef, stage: &mut SelectedStage) -> Result<()> {
    for input in &snippet.inputs {
        validate_and_add_attribute_def(input, &mut stage.inputs)?;
    }
    for output in &snippet.outputs {
        validate_and_add_attribute_def(output, &mut stage.outputs)?;
    }
    for uniform in &snippet.uniforms {
        validate_and_add_uniform_def(uniform, &mut stage.uniforms)?;
    }
    for sampler in &snippet.samplers {
        validate_and_add_sampler_def(sampler, &mut stage.samplers)?;
    }

    if !snippet.name.is_empty() {
        stage.snippet_names.push(snippet.name.clone());
    }
    if !snippet.code.is_empty() {
        stage.code.push(snippet.code.clone());
    }
    if !snippet.main_code.is_empty() {
        stage.main.push(MainBlock {
            snippet: snippet.name.clone(),
            code: snippet.main_code.clone(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section 3 — Declaration merging
// ═══════════════════════════════════════════════════════════════════════════════

/// Adds `uniform` unless an identical declaration exists. A same-named, different
/// declaration is a conflict and leaves `uniforms` untouched.
pub fn validate_and_add_uniform_def(
    uniform: &ShaderUniformDef,
    uniforms: &mut Vec<ShaderUniformDef>,
) -> Result<()> {
    match uniforms.iter().find(|existing| existing.name == uniform.name) {
        None => {
            uniforms.push(uniform.clone());
            Ok(())
        }
        Some(existing) if existing.matches(uniform) => Ok(()),
        Some(_) => {
            log::error!(
                "Snippets contain uniforms with same name ({}) but different definitions.",
                uniform.name
            );
            Err(Error::UniformConflict {
                name: uniform.name.clone(),
            })
        }
    }
}

/// Attribute counterpart of [`validate_and_add_uniform_def`]; compares type and usage.
pub fn validate_and_add_attribute_def(
    attribute: &ShaderAttributeDef,
    attributes: &mut Vec<ShaderAttributeDef>,
) -> Result<()> {
    match attributes.iter().find(|existing| existing.name == attribute.name) {
        None => {
            attributes.push(attribute.clone());
            Ok(())
        }
        Some(existing) if existing.matches(attribute) => Ok(()),
        Some(_) => {
            log::error!(
                "Snippets contain attributes with same name ({}) but different definitions.",
                attribute.name
            );
            Err(Error::AttributeConflict {
                name: attribute.name.clone(),
            })
        }
    }
}

/// Sampler counterpart of [`validate_and_add_uniform_def`]; compares usage and target.
pub fn validate_and_add_sampler_def(
    sampler: &ShaderSamplerDef,
    samplers: &mut Vec<ShaderSamplerDef>,
) -> Result<()> {
    match samplers.iter().find(|existing| existing.name == sampler.name) {
        None => {
            samplers.push(sampler.clone());
            Ok(())
        }
        Some(existing) if existing.matches(sampler) => Ok(()),
        Some(_) => {
            log::error!(
                "Snippets contain samplers with same name ({}) but different definitions.",
                sampler.name
            );
            Err(Error::SamplerConflict {
                name: sampler.name.clone(),
            })
        }
    }
}

/// Program-wide interface: uniforms and samplers of every stage, vertex inputs as attributes.
pub fn create_shader_description(
    shading_model: &str,
    result: &SnippetSelectionResult,
) -> Result<ShaderDescription> {
    let mut description = ShaderDescription::new(shading_model);
    for stage in &result.stages {
        for uniform in &stage.uniforms {
            validate_and_add_uniform_def(uniform, &mut description.uniforms)?;
        }
        for sampler in &stage.samplers {
            validate_and_add_sampler_def(sampler, &mut description.samplers)?;
        }
    }
    for input in &result.stage(ShaderStageType::Vertex).inputs {
        validate_and_add_attribute_def(input, &mut description.attributes)?;
    }
    Ok(description)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section 4 — Diagnostics
// ═══════════════════════════════════════════════════════════════════════════════

fn describe_selection(
    def: &ShaderDef,
    params: &ShaderSelectionParams,
    snippets: &StageSnippets<'_>,
) -> String {
    let mut out = String::from("Selection Parameters\n  Features:\n");
    for feature in &params.features {
        let _ = writeln!(out, "    {}", feature);
    }
    out.push_str("  Environment:\n");
    for flag in &params.environment {
        let _ = writeln!(out, "    {}", flag);
    }

    out.push_str("Shader Snippets\n");
    for stage in &def.stages {
        for snippet in &stage.snippets {
            let _ = writeln!(
                out,
                "  Snippet: {}\n    Features: {:?}\n    Environment: {:?}",
                snippet.name, snippet.features, snippet.environment
            );
        }
    }

    out.push_str("Selection Results\n");
    for stage_type in ShaderStageType::ALL {
        let _ = writeln!(out, "  Stage {}", stage_type.name());
        for snippet in &snippets[stage_type.index()] {
            let _ = writeln!(out, "    {}", snippet.name);
        }
    }
    out
}
