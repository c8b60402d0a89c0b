//! Seam to the native graphics driver.
//!
//! The cache never talks to a graphics API directly. Backends implement [`Device`] to turn
//! translated shader binaries into modules and completed keys into pipeline objects.

use std::fmt;

use thiserror::Error;

use crate::pipeline_key::{ComputePipelineKey, GraphicsPipelineKey};
use crate::regs::{Stage, MAX_GRAPHICS_STAGES};
use crate::translate::ShaderInfo;

/// Packs an API version the way the driver reports it (`major << 22 | minor << 12`).
pub const fn make_api_version(major: u32, minor: u32) -> u32 {
    (major << 22) | (minor << 12)
}

pub const API_VERSION_1_3: u32 = make_api_version(1, 3);

/// Driver capabilities that influence shader translation.
///
/// These are queried once when the cache is created and never change for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    pub api_version: u32,
    pub subgroup_size: u32,
    /// Whether the driver can use a `[-w, w]` clip-space depth range natively.
    pub depth_clip_control: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            api_version: API_VERSION_1_3,
            subgroup_size: 64,
            depth_clip_control: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("out of device memory")]
    OutOfMemory,
    #[error("driver rejected object: {0}")]
    Rejected(String),
}

/// One shader stage of a pipeline being created.
pub struct PipelineStage<'a, M> {
    pub stage: Stage,
    pub info: &'a ShaderInfo,
    pub module: &'a M,
}

impl<M: fmt::Debug> fmt::Debug for PipelineStage<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStage")
            .field("stage", &self.stage)
            .field("pgm_hash", &format_args!("{:#x}", self.info.pgm_hash))
            .field("module", self.module)
            .finish()
    }
}

pub struct GraphicsPipelineDesc<'a, M> {
    pub key: &'a GraphicsPipelineKey,
    /// Indexed by [`Stage::index`]; `None` for stages without a program.
    pub stages: [Option<PipelineStage<'a, M>>; MAX_GRAPHICS_STAGES],
}

pub struct ComputePipelineDesc<'a, M> {
    pub key: &'a ComputePipelineKey,
    pub stage: PipelineStage<'a, M>,
}

pub trait Device {
    type ShaderModule: Clone + fmt::Debug;
    type GraphicsPipeline;
    type ComputePipeline;

    fn capabilities(&self) -> DeviceCapabilities;

    fn create_shader_module(&mut self, code: &[u32]) -> Result<Self::ShaderModule, DeviceError>;

    /// Attach a debug name to a shader module. Purely diagnostic.
    fn set_object_name(&mut self, _module: &Self::ShaderModule, _name: &str) {}

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc<'_, Self::ShaderModule>,
    ) -> Result<Self::GraphicsPipeline, DeviceError>;

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDesc<'_, Self::ShaderModule>,
    ) -> Result<Self::ComputePipeline, DeviceError>;
}
