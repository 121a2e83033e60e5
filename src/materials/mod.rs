// src/materials/mod.rs
//! Materials: uniform/texture binding tables and their render state.

pub mod material;
pub mod render_state;
pub mod variant;

pub use material::{Material, DOUBLE_SIDED, IS_OPAQUE};
pub use render_state::{
    BlendFactor, BlendState, CullFace, CullState, DepthState, RenderFunction, StencilAction,
    StencilState,
};
pub use variant::{Variant, VariantMap};
