// src/lib.rs
//! Lullaby render core.
//!
//! # Features
//! - **Sort order**: fixed-width draw-order keys built from an entity hierarchy.
//! - **Uniform data**: typed, inline-when-small uniform payloads.
//! - **Shader variants**: snippet selection by language, version, environment and
//!   feature flags, source generation and a cached shader factory.
//! - **Materials**: uniform/texture binding tables with per-material render state.
//! - **Uniform linker**: propagation of uniform updates between entities.
//!
//! GPU access goes through [`gpu::GpuContext`]; [`gpu::HeadlessGpuContext`] records
//! calls instead of issuing them.

pub mod logging;

pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod gpu;
pub mod hash;
pub mod materials;
pub mod shaders;
pub mod sort_order;
pub mod texture;
pub mod uniform_data;
pub mod uniform_linker;

pub use config::RenderConfig;
pub use entity::EntityId;
pub use error::{Error, Result};
pub use hash::{hash, HashValue};
pub use materials::{Material, Variant, VariantMap};
pub use shaders::{Shader, ShaderDef, ShaderFactory, ShaderLanguage, ShaderSelectionParams};
pub use sort_order::{OrderKey, RenderSortOrder, SortOrderManager};
pub use texture::{MaterialTextureUsage, Texture, TextureUsageInfo};
pub use uniform_data::{ShaderDataType, UniformData};
pub use uniform_linker::{UniformLinker, UniformTargets};
