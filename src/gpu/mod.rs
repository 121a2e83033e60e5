// src/gpu/mod.rs
//! The GPU seam.
//!
//! The render core never talks to a graphics API directly. Everything that needs
//! the device receives a `&mut dyn GpuContext` from the owner of the rendering
//! thread. `HeadlessGpuContext` records calls instead of issuing them and backs
//! tools and tests.

use crate::error::{Error, Result};
use crate::hash::HashValue;
use crate::uniform_data::{ShaderDataType, UniformData};

/// Linked GPU program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ProgramHandle(pub u32);

/// GPU texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureHandle(pub u32);

/// Calls the render core issues against the device.
pub trait GpuContext {
    /// Number of sampler units available to one program.
    fn max_texture_units(&self) -> u32;

    /// Compiles both stages and links them.
    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle>;

    fn release_program(&mut self, program: ProgramHandle);

    /// Uploads a plain (non-block) uniform.
    fn bind_uniform(&mut self, program: ProgramHandle, name: HashValue, data: &UniformData);

    /// Uploads the contents of a uniform block.
    fn bind_uniform_block(&mut self, program: ProgramHandle, name: HashValue, bytes: &[u8]);

    /// Binds `texture` (or nothing) to sampler `unit`.
    fn bind_sampler(&mut self, program: ProgramHandle, unit: u32, texture: Option<TextureHandle>);
}

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CompileProgram {
        program: ProgramHandle,
        vertex_source: String,
        fragment_source: String,
    },
    ReleaseProgram(ProgramHandle),
    Uniform {
        program: ProgramHandle,
        name: HashValue,
        data_type: ShaderDataType,
        bytes: Vec<u8>,
    },
    UniformBlock {
        program: ProgramHandle,
        name: HashValue,
        bytes: Vec<u8>,
    },
    Sampler {
        program: ProgramHandle,
        unit: u32,
        texture: Option<TextureHandle>,
    },
}

/// Device stand-in that records calls.
#[derive(Debug)]
pub struct HeadlessGpuContext {
    calls: Vec<GpuCall>,
    next_program: u32,
    max_texture_units: u32,
    reject_compilation: bool,
}

impl Default for HeadlessGpuContext {
    fn default() -> Self {
        Self::new(16)
    }
}

impl HeadlessGpuContext {
    pub fn new(max_texture_units: u32) -> Self {
        Self {
            calls: Vec::new(),
            next_program: 1,
            max_texture_units,
            reject_compilation: false,
        }
    }

    /// Makes subsequent `compile_program` calls fail.
    pub fn with_rejected_compilation(mut self) -> Self {
        self.reject_compilation = true;
        self
    }

    #[inline]
    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Bytes of the last plain uniform bound under `name`.
    pub fn uniform_value(&self, program: ProgramHandle, name: HashValue) -> Option<&[u8]> {
        self.calls.iter().rev().find_map(|call| match call {
            GpuCall::Uniform {
                program: p,
                name: n,
                bytes,
                ..
            } if *p == program && *n == name => Some(bytes.as_slice()),
            _ => None,
        })
    }

    /// How many times a plain uniform was bound under `name`.
    pub fn uniform_bind_count(&self, name: HashValue) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, GpuCall::Uniform { name: n, .. } if *n == name))
            .count()
    }

    /// Last texture bound to `unit`, `Some(None)` for an explicitly empty sampler.
    pub fn sampler_binding(
        &self,
        program: ProgramHandle,
        unit: u32,
    ) -> Option<Option<TextureHandle>> {
        self.calls.iter().rev().find_map(|call| match call {
            GpuCall::Sampler {
                program: p,
                unit: u,
                texture,
            } if *p == program && *u == unit => Some(*texture),
            _ => None,
        })
    }
}

impl GpuContext for HeadlessGpuContext {
    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle> {
        if self.reject_compilation {
            return Err(Error::ProgramCompilation("headless context rejects programs".into()));
        }
        let program = ProgramHandle(self.next_program);
        self.next_program += 1;
        self.calls.push(GpuCall::CompileProgram {
            program,
            vertex_source: vertex_source.to_string(),
            fragment_source: fragment_source.to_string(),
        });
        Ok(program)
    }

    fn release_program(&mut self, program: ProgramHandle) {
        self.calls.push(GpuCall::ReleaseProgram(program));
    }

    fn bind_uniform(&mut self, program: ProgramHandle, name: HashValue, data: &UniformData) {
        self.calls.push(GpuCall::Uniform {
            program,
            name,
            data_type: data.data_type(),
            bytes: data.as_bytes().to_vec(),
        });
    }

    fn bind_uniform_block(&mut self, program: ProgramHandle, name: HashValue, bytes: &[u8]) {
        self.calls.push(GpuCall::UniformBlock {
            program,
            name,
            bytes: bytes.to_vec(),
        });
    }

    fn bind_sampler(&mut self, program: ProgramHandle, unit: u32, texture: Option<TextureHandle>) {
        self.calls.push(GpuCall::Sampler { program, unit, texture });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;

    #[test]
    fn test_records_calls_in_order() {
        let mut gpu = HeadlessGpuContext::new(8);
        let program = gpu.compile_program("void main() {}", "void main() {}").unwrap();
        assert_eq!(program, ProgramHandle(1));

        let color = UniformData::from_values(ShaderDataType::Float4, &[1.0f32, 0.0, 0.0, 1.0]);
        gpu.bind_uniform(program, hash("color"), &color);
        gpu.bind_sampler(program, 0, Some(TextureHandle(4)));
        gpu.bind_sampler(program, 1, None);

        assert_eq!(gpu.calls().len(), 4);
        assert_eq!(gpu.uniform_value(program, hash("color")), Some(color.as_bytes()));
        assert_eq!(gpu.sampler_binding(program, 0), Some(Some(TextureHandle(4))));
        assert_eq!(gpu.sampler_binding(program, 1), Some(None));
        assert_eq!(gpu.sampler_binding(program, 2), None);
    }

    #[test]
    fn test_rejected_compilation() {
        let mut gpu = HeadlessGpuContext::default().with_rejected_compilation();
        assert!(gpu.compile_program("", "").is_err());
        assert!(gpu.calls().is_empty());
    }
}
