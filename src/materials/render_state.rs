// src/materials/render_state.rs
//! Per-material render state overrides.
//!
//! A material holds each category as `Option<_>`: `None` inherits whatever the
//! renderer has bound, `Some` overrides it for the draw.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderFunction {
    Always,
    Never,
    #[default]
    Less,
    LessEqual,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullFace {
    Front,
    #[default]
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StencilAction {
    #[default]
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendState {
    pub enabled: bool,
    pub src_color: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_color: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl Default for BlendState {
    fn default() -> Self {
        Self::DISABLED
    }
}

impl BlendState {
    pub const DISABLED: Self = Self {
        enabled: false,
        src_color: BlendFactor::One,
        src_alpha: BlendFactor::One,
        dst_color: BlendFactor::Zero,
        dst_alpha: BlendFactor::Zero,
    };

    /// Standard non-premultiplied alpha blending.
    pub const ALPHA: Self = Self {
        enabled: true,
        src_color: BlendFactor::SrcAlpha,
        src_alpha: BlendFactor::SrcAlpha,
        dst_color: BlendFactor::OneMinusSrcAlpha,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DepthState {
    pub test_enabled: bool,
    pub write_enabled: bool,
    pub function: RenderFunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CullState {
    pub enabled: bool,
    pub face: CullFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StencilState {
    pub enabled: bool,
    pub function: RenderFunction,
    pub reference: i32,
    pub mask: u32,
    pub stencil_fail: StencilAction,
    pub depth_fail: StencilAction,
    pub pass: StencilAction,
}
