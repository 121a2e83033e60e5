// src/error.rs
//! Error handling for the render core.
//!
//! - **Taxonomy**: selection conflicts, invalid uniform types, uniform buffer overflow,
//!   texture channel overflow and shader definition errors each get their own variant.
//! - **Features**: context chaining, custom messages, transparent std/serde errors,
//!   `is_*` helpers, `Result` alias.
//! - **Cheap**: enum discriminant matching, allocations only on error paths.

use std::fmt;
use thiserror::Error;

use crate::shaders::shader_def::ShaderStageType;

/// Main error type for the crate. `Send + Sync + 'static`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Two snippets declare the same uniform name with different definitions.
    #[error("snippets contain uniforms with same name ({name}) but different definitions")]
    UniformConflict { name: String },

    /// Two snippets declare the same attribute name with different type/usage.
    #[error("snippets contain attributes with same name ({name}) but different definitions")]
    AttributeConflict { name: String },

    /// Two snippets declare the same sampler name with different usage.
    #[error("snippets contain samplers with same name ({name}) but different definitions")]
    SamplerConflict { name: String },

    /// Raw value outside the `ShaderDataType` range.
    #[error("invalid uniform type: {0}")]
    InvalidUniformType(u8),

    /// Attempt to write more bytes than a uniform holds.
    #[error("uniform data overflow: {requested} bytes requested, {capacity} available")]
    UniformDataOverflow { requested: usize, capacity: usize },

    /// More than four channel usages passed to a texture usage.
    #[error("texture usage has {0} channels, at most 4 are supported")]
    TextureChannelOverflow(usize),

    /// Texture usage name that does not map to a known usage.
    #[error("unknown texture usage: {0}")]
    UnknownTextureUsage(String),

    /// Structurally invalid shader definition.
    #[error("invalid shader definition: {0}")]
    InvalidShaderDef(String),

    /// A mandatory shader stage ended up without code.
    #[error("shader is missing a {0:?} stage")]
    MissingStage(ShaderStageType),

    /// The GPU context refused to compile or link a program.
    #[error("shader program compilation failed: {0}")]
    ProgramCompilation(String),

    /// I/O errors (config and shader definition files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Simple custom message.
    #[error("{0}")]
    Custom(String),

    /// Context chaining.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a custom error message.
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a formatted custom error (like `format!` but returns `Error`).
    #[inline]
    pub fn format(args: fmt::Arguments) -> Self {
        Self::Custom(fmt::format(args))
    }

    /// Add context to any error (chainable).
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Quick static message.
    #[inline]
    pub fn msg(msg: &'static str) -> Self {
        Self::Custom(msg.into())
    }

    /// Strips any `WithContext` layers and returns the underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_root() {
        let err = Error::UniformConflict { name: "color".into() }.context("selecting pbr");
        assert!(matches!(err.root(), Error::UniformConflict { .. }));
        assert_eq!(
            err.to_string(),
            "selecting pbr: snippets contain uniforms with same name (color) but different definitions"
        );
    }

    #[test]
    fn test_io_error_keeps_root() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::from(io).context("loading config");
        assert!(matches!(err.root(), Error::Io(_)));
        assert_eq!(err.to_string(), "loading config: I/O error: missing");
    }
}
