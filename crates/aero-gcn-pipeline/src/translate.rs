//! Seam to the GCN shader recompiler.

use thiserror::Error;

use crate::device::{DeviceCapabilities, API_VERSION_1_3};
use crate::regs::{ShaderParams, Stage};
use crate::runtime_info::RuntimeInfo;

/// SPIR-V 1.6, available from API 1.3.
pub const SPIRV_1_6: u32 = 0x0001_0600;
/// SPIR-V 1.5, the floor for older drivers.
pub const SPIRV_1_5: u32 = 0x0001_0500;

/// Target capabilities handed to the translator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Profile {
    pub supported_spirv: u32,
    pub subgroup_size: u32,
    pub support_explicit_workgroup_layout: bool,
}

impl Profile {
    pub fn from_capabilities(caps: &DeviceCapabilities) -> Self {
        Self {
            supported_spirv: if caps.api_version >= API_VERSION_1_3 {
                SPIRV_1_6
            } else {
                SPIRV_1_5
            },
            subgroup_size: caps.subgroup_size,
            support_explicit_workgroup_layout: true,
        }
    }
}

/// Program information gathered while translating a shader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderInfo {
    pub stage: Stage,
    pub pgm_hash: u64,
    pub user_data: Vec<u32>,
    /// Render targets exported by a fragment shader, indexed by hardware slot.
    pub mrt_mask: u32,
    pub num_buffers: u32,
    pub num_images: u32,
    pub num_samplers: u32,
}

impl ShaderInfo {
    pub fn new(stage: Stage, params: &ShaderParams<'_>) -> Self {
        Self {
            stage,
            pgm_hash: params.hash,
            user_data: params.user_data.to_vec(),
            mrt_mask: 0,
            num_buffers: 0,
            num_images: 0,
            num_samplers: 0,
        }
    }

    /// Number of descriptor bindings this program consumes.
    pub fn num_bindings(&self) -> u32 {
        self.num_buffers + self.num_images + self.num_samplers
    }
}

/// Running binding index shared by every stage of one key refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindingAllocator {
    next: u32,
}

impl BindingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next binding index that will be handed out.
    pub fn current(&self) -> u32 {
        self.next
    }

    pub fn advance(&mut self, count: u32) {
        self.next += count;
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("malformed shader bytecode: {0}")]
    Malformed(String),
    #[error("unsupported shader feature: {0}")]
    Unsupported(String),
}

/// Recompiles GCN bytecode into a native shader binary.
///
/// `translate` lowers the bytecode into the translator's intermediate program and fills in
/// `info`; `emit` generates the final binary, allocating resource bindings from `binding`.
pub trait ShaderTranslator {
    type Program;

    fn translate(
        &mut self,
        code: &[u32],
        info: &mut ShaderInfo,
        runtime_info: &RuntimeInfo,
        profile: &Profile,
    ) -> Result<Self::Program, TranslateError>;

    fn emit(
        &mut self,
        profile: &Profile,
        runtime_info: &RuntimeInfo,
        program: Self::Program,
        binding: &mut BindingAllocator,
    ) -> Result<Vec<u32>, TranslateError>;
}
