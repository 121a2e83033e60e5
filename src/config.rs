// src/config.rs
//! Renderer configuration, loaded from JSON.

use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::Result;
use crate::hash::hash;
use crate::shaders::shader_def::ShaderLanguage;
use crate::shaders::shader_factory::DEFAULT_CACHE_CAPACITY;
use crate::shaders::snippets_selector::ShaderSelectionParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub language: ShaderLanguage,
    /// 0 means no cap.
    pub max_shader_version: u32,
    /// Environment flag names, hashed into every selection.
    pub environment: Vec<String>,
    pub max_texture_units: u32,
    pub shader_cache_capacity: usize,
    /// Overrides the build default; `RUST_LOG` still wins.
    pub log_level: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            language: ShaderLanguage::GlslEs,
            max_shader_version: 0,
            environment: Vec::new(),
            max_texture_units: 16,
            shader_cache_capacity: DEFAULT_CACHE_CAPACITY,
            log_level: None,
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing render config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading render config {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Configured level; unknown names fall back to the build default with a warning.
    pub fn log_level(&self) -> Option<LevelFilter> {
        let name = self.log_level.as_deref()?;
        let level = crate::logging::parse_level(name);
        if level.is_none() {
            log::warn!("unknown log level {:?}", name);
        }
        level
    }

    /// Selection context for this renderer plus `features`.
    pub fn selection_params(&self, features: &[&str]) -> ShaderSelectionParams {
        let mut params = ShaderSelectionParams::new(self.language)
            .with_max_version(self.max_shader_version)
            .with_features(features);
        params.environment.extend(self.environment.iter().map(|flag| hash(flag)));
        params
    }
}
