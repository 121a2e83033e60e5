// src/uniform_data.rs
//! Type-tagged byte storage for one shader uniform.
//!
//! # Features
//! - Fixed `ShaderDataType` → byte size table shared with code generation
//! - Values up to 16 bytes live inline, larger arrays and matrices go to the heap
//! - Storage is 32-bit aligned so float/int views can be borrowed without copying
//! - Shrinking reuses the current allocation, growing reallocates to the exact size
//! - `Clone` is a deep copy; `take()` moves the value out and leaves an empty inline value

use std::mem;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Element type of a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ShaderDataType {
    Float1 = 0,
    Float2 = 1,
    Float3 = 2,
    Float4 = 3,
    Float2x2 = 4,
    Float3x3 = 5,
    Float4x4 = 6,
    Int1 = 7,
    Int2 = 8,
    Int3 = 9,
    Int4 = 10,
    BufferObject = 11,
}

impl ShaderDataType {
    pub const ALL: [ShaderDataType; 12] = [
        ShaderDataType::Float1,
        ShaderDataType::Float2,
        ShaderDataType::Float3,
        ShaderDataType::Float4,
        ShaderDataType::Float2x2,
        ShaderDataType::Float3x3,
        ShaderDataType::Float4x4,
        ShaderDataType::Int1,
        ShaderDataType::Int2,
        ShaderDataType::Int3,
        ShaderDataType::Int4,
        ShaderDataType::BufferObject,
    ];

    /// Converts a raw discriminant, rejecting out-of-range values.
    pub fn from_raw(raw: u8) -> Result<Self> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(Error::InvalidUniformType(raw))
    }

    /// Size in bytes of one element of this type.
    #[inline]
    pub const fn byte_size(self) -> usize {
        match self {
            ShaderDataType::Float1 => 4,
            ShaderDataType::Float2 => 8,
            ShaderDataType::Float3 => 12,
            ShaderDataType::Float4 => 16,
            ShaderDataType::Float2x2 => 16,
            ShaderDataType::Float3x3 => 36,
            ShaderDataType::Float4x4 => 64,
            ShaderDataType::Int1 => 4,
            ShaderDataType::Int2 => 8,
            ShaderDataType::Int3 => 12,
            ShaderDataType::Int4 => 16,
            ShaderDataType::BufferObject => 1,
        }
    }

    /// Number of scalar components in one element (`Float3x3` → 9).
    #[inline]
    pub const fn component_count(self) -> usize {
        match self {
            ShaderDataType::BufferObject => 1,
            other => other.byte_size() / 4,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        (self as u8) <= ShaderDataType::Float4x4 as u8
    }

    #[inline]
    pub const fn is_int(self) -> bool {
        matches!(
            self,
            ShaderDataType::Int1
                | ShaderDataType::Int2
                | ShaderDataType::Int3
                | ShaderDataType::Int4
        )
    }

    /// GLSL spelling, `None` for uniform blocks.
    pub const fn glsl_name(self) -> Option<&'static str> {
        match self {
            ShaderDataType::Float1 => Some("float"),
            ShaderDataType::Float2 => Some("vec2"),
            ShaderDataType::Float3 => Some("vec3"),
            ShaderDataType::Float4 => Some("vec4"),
            ShaderDataType::Float2x2 => Some("mat2"),
            ShaderDataType::Float3x3 => Some("mat3"),
            ShaderDataType::Float4x4 => Some("mat4"),
            ShaderDataType::Int1 => Some("int"),
            ShaderDataType::Int2 => Some("ivec2"),
            ShaderDataType::Int3 => Some("ivec3"),
            ShaderDataType::Int4 => Some("ivec4"),
            ShaderDataType::BufferObject => None,
        }
    }
}

/// Byte size of a raw type value. Unknown values are a programming error and
/// fall back to 1 so element counts never divide by zero.
pub fn bytes_size_of_raw(raw: u8) -> usize {
    match ShaderDataType::from_raw(raw) {
        Ok(data_type) => data_type.byte_size(),
        Err(err) => {
            crate::dfatal!("{}", err);
            1
        }
    }
}

const INLINE_WORDS: usize = 4;

/// Bytes that fit without a heap allocation.
pub const INLINE_CAPACITY: usize = INLINE_WORDS * 4;

/// Data for one uniform: a type tag plus `byte_size(type) * count` bytes.
#[derive(Debug, Clone)]
pub struct UniformData {
    data_type: ShaderDataType,
    size: usize,
    words: SmallVec<[u32; INLINE_WORDS]>,
}

impl Default for UniformData {
    fn default() -> Self {
        Self::new(ShaderDataType::Float1)
    }
}

impl UniformData {
    /// An empty value of the given type.
    pub fn new(data_type: ShaderDataType) -> Self {
        Self {
            data_type,
            size: 0,
            words: SmallVec::new(),
        }
    }

    /// `count` zero-initialized elements.
    pub fn with_count(data_type: ShaderDataType, count: usize) -> Self {
        let mut data = Self::new(data_type);
        data.resize(data_type.byte_size() * count);
        data
    }

    pub fn from_bytes(data_type: ShaderDataType, bytes: &[u8]) -> Self {
        let mut data = Self::new(data_type);
        data.set_data(data_type, bytes);
        data
    }

    /// Builds a value from plain-old-data elements (`f32`, `[f32; 4]`, `i32`, ...).
    pub fn from_values<T: bytemuck::Pod>(data_type: ShaderDataType, values: &[T]) -> Self {
        Self::from_bytes(data_type, bytemuck::cast_slice(values))
    }

    /// Replaces type and contents.
    ///
    /// Empty `bytes` drop any heap buffer and leave `size() == 0` with the new type.
    pub fn set_data(&mut self, data_type: ShaderDataType, bytes: &[u8]) {
        self.data_type = data_type;
        if bytes.is_empty() {
            self.size = 0;
            self.words = SmallVec::new();
            return;
        }
        self.resize(bytes.len());
        self.bytes_mut().copy_from_slice(bytes);
    }

    pub fn set_values<T: bytemuck::Pod>(&mut self, data_type: ShaderDataType, values: &[T]) {
        self.set_data(data_type, bytemuck::cast_slice(values));
    }

    /// Overwrites the leading bytes in place without changing size or type.
    pub fn update(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.size {
            let err = Error::UniformDataOverflow {
                requested: bytes.len(),
                capacity: self.size,
            };
            log::error!("{}", err);
            return Err(err);
        }
        self.bytes_mut()[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    #[inline]
    pub fn data_type(&self) -> ShaderDataType {
        self.data_type
    }

    /// Size of the stored data in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of elements. Uniform blocks always count as one.
    #[inline]
    pub fn count(&self) -> usize {
        match self.data_type {
            ShaderDataType::BufferObject => 1,
            other => self.size / other.byte_size(),
        }
    }

    /// Bytes the current allocation can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.capacity() * 4
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        !self.words.spilled()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.size]
    }

    /// Typed view of the data. `None` if the size is not a multiple of `T`.
    pub fn data<T: bytemuck::Pod>(&self) -> Option<&[T]> {
        bytemuck::try_cast_slice(self.as_bytes()).ok()
    }

    /// Moves the value out, leaving an empty inline value of the same type behind.
    pub fn take(&mut self) -> UniformData {
        UniformData {
            data_type: self.data_type,
            size: mem::take(&mut self.size),
            words: mem::take(&mut self.words),
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        let size = self.size;
        &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..size]
    }

    fn resize(&mut self, size: usize) {
        let words = size.div_ceil(4);
        if words > self.words.capacity() {
            self.words = SmallVec::new();
            self.words.reserve_exact(words);
        }
        self.words.resize(words, 0);
        self.size = size;
    }
}

impl PartialEq for UniformData {
    fn eq(&self, other: &Self) -> bool {
        self.data_type == other.data_type && self.as_bytes() == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes() {
        let expected = [4, 8, 12, 16, 16, 36, 64, 4, 8, 12, 16, 1];
        for (data_type, size) in ShaderDataType::ALL.iter().zip(expected) {
            assert_eq!(data_type.byte_size(), size, "{:?}", data_type);
        }
        assert_eq!(ShaderDataType::Float3x3.component_count(), 9);
        assert!(ShaderDataType::Float4x4.is_float());
        assert!(!ShaderDataType::Int1.is_float());
        assert!(ShaderDataType::Int3.is_int());
    }

    #[test]
    fn test_invalid_raw_type() {
        assert_eq!(ShaderDataType::from_raw(3).unwrap(), ShaderDataType::Float4);
        assert!(matches!(ShaderDataType::from_raw(12), Err(Error::InvalidUniformType(12))));
    }

    #[cfg(not(feature = "strict-dfatal"))]
    #[test]
    fn test_invalid_raw_size_falls_back() {
        assert_eq!(bytes_size_of_raw(6), 64);
        assert_eq!(bytes_size_of_raw(200), 1);
    }

    #[test]
    fn test_set_data_round_trip() {
        let values = [1.0f32, 2.0, 3.0, 4.0];
        let data = UniformData::from_values(ShaderDataType::Float4, &values);
        assert_eq!(data.size(), 16);
        assert_eq!(data.count(), 1);
        assert!(data.is_inline());
        assert_eq!(data.data::<f32>().unwrap(), &values);
        assert_eq!(data.data::<[f32; 4]>().unwrap(), &[values]);
    }

    #[test]
    fn test_array_count() {
        let values = [0.5f32; 12];
        let data = UniformData::from_values(ShaderDataType::Float3, &values);
        assert_eq!(data.count(), 4);
        assert_eq!(data.size(), 48);
        assert!(!data.is_inline());
        assert_eq!(data.capacity(), 48);
    }

    #[test]
    fn test_int_data() {
        let data = UniformData::from_values(ShaderDataType::Int2, &[7i32, -3]);
        assert_eq!(data.data::<i32>().unwrap(), &[7, -3]);
        assert_eq!(data.count(), 1);
    }

    #[test]
    fn test_buffer_object_counts_one() {
        let data = UniformData::from_bytes(ShaderDataType::BufferObject, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(data.count(), 1);
        assert_eq!(data.as_bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_clone_is_deep() {
        let original = UniformData::from_values(ShaderDataType::Float4x4, &[1.0f32; 16]);
        let mut copy = original.clone();
        copy.update(bytemuck::cast_slice(&[9.0f32])).unwrap();

        assert_eq!(original.data::<f32>().unwrap()[0], 1.0);
        assert_eq!(copy.data::<f32>().unwrap()[0], 9.0);
        assert_ne!(original, copy);
    }

    #[test]
    fn test_take_moves_heap() {
        let mut source = UniformData::from_values(ShaderDataType::Float4x4, &[2.0f32; 16]);
        let moved = source.take();

        assert_eq!(moved.size(), 64);
        assert!(!moved.is_inline());
        assert_eq!(source.size(), 0);
        assert!(source.is_inline());
        assert_eq!(source.data_type(), ShaderDataType::Float4x4);
    }

    #[test]
    fn test_take_copies_inline() {
        let mut source = UniformData::from_values(ShaderDataType::Float2, &[1.0f32, 2.0]);
        let moved = source.take();
        assert_eq!(moved.data::<f32>().unwrap(), &[1.0, 2.0]);
        assert!(source.is_empty());
    }

    #[test]
    fn test_shrink_reuses_capacity() {
        let mut data = UniformData::from_values(ShaderDataType::Float4x4, &[1.0f32; 16]);
        assert_eq!(data.capacity(), 64);

        data.set_values(ShaderDataType::Float1, &[5.0f32]);
        assert_eq!(data.size(), 4);
        assert_eq!(data.capacity(), 64);
        assert!(!data.is_inline());
        assert_eq!(data.data::<f32>().unwrap(), &[5.0]);
    }

    #[test]
    fn test_grow_reallocates_exactly() {
        let mut data = UniformData::from_values(ShaderDataType::Float4, &[1.0f32; 4]);
        assert!(data.is_inline());

        data.set_values(ShaderDataType::Float3x3, &[1.0f32; 9]);
        assert!(!data.is_inline());
        assert_eq!(data.capacity(), 36);

        data.set_values(ShaderDataType::Float4x4, &[3.0f32; 16]);
        assert_eq!(data.capacity(), 64);
        assert_eq!(data.count(), 1);
    }

    #[test]
    fn test_regrow_within_capacity_keeps_buffer() {
        let mut data = UniformData::from_values(ShaderDataType::Float4x4, &[1.0f32; 16]);
        data.set_values(ShaderDataType::Float1, &[5.0f32]);
        data.set_values(ShaderDataType::Float3x3, &[2.0f32; 9]);
        assert_eq!(data.capacity(), 64);
        assert_eq!(data.data::<f32>().unwrap(), &[2.0f32; 9]);

        let grown = UniformData::with_count(ShaderDataType::Int4, 3);
        assert_eq!(grown.data::<i32>().unwrap(), &[0; 12]);
    }

    #[test]
    fn test_empty_set_frees_heap_keeps_type() {
        let mut data = UniformData::from_values(ShaderDataType::Float4x4, &[1.0f32; 16]);
        data.set_data(ShaderDataType::Int4, &[]);
        assert_eq!(data.size(), 0);
        assert_eq!(data.count(), 0);
        assert_eq!(data.data_type(), ShaderDataType::Int4);
        assert!(data.is_inline());
    }

    #[test]
    fn test_update_rejects_overflow() {
        let mut data = UniformData::with_count(ShaderDataType::Float2, 1);
        assert_eq!(data.data::<f32>().unwrap(), &[0.0, 0.0]);

        let err = data
            .update(bytemuck::cast_slice(&[1.0f32, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, Error::UniformDataOverflow { requested: 12, capacity: 8 }));
        assert_eq!(data.data::<f32>().unwrap(), &[0.0, 0.0]);

        data.update(bytemuck::cast_slice(&[4.0f32])).unwrap();
        assert_eq!(data.data::<f32>().unwrap(), &[4.0, 0.0]);
    }
}
