// src/materials/variant.rs
//! Closed set of material property values.

use std::collections::BTreeMap;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::hash::HashValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

/// Material properties keyed by name hash.
pub type VariantMap = BTreeMap<HashValue, Variant>;

impl Variant {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The boolean payload, or `default` for any other type.
    #[inline]
    pub fn bool_or(&self, default: bool) -> bool {
        self.as_bool().unwrap_or(default)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Float(_) => "float",
            Variant::String(_) => "string",
            Variant::Vec2(_) => "vec2",
            Variant::Vec3(_) => "vec3",
            Variant::Vec4(_) => "vec4",
            Variant::Mat4(_) => "mat4",
        }
    }
}

macro_rules! impl_from_variant {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                #[inline]
                fn from(value: $ty) -> Self {
                    Variant::$variant(value)
                }
            }
        )*
    };
}

impl_from_variant! {
    bool => Bool,
    i32 => Int,
    f32 => Float,
    String => String,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat4 => Mat4,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_or() {
        assert!(Variant::from(true).bool_or(false));
        assert!(!Variant::from(false).bool_or(true));
        assert!(Variant::from(1.0f32).bool_or(true));
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Variant::from(3), Variant::Int(3));
        assert_eq!(Variant::from("pbr"), Variant::String("pbr".into()));
        assert_eq!(Variant::from(Vec3::ONE).type_name(), "vec3");
        assert_eq!(Variant::from(Mat4::IDENTITY).type_name(), "mat4");
    }
}
