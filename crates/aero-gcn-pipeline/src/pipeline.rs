//! Pipeline objects owned by the cache.

use crate::device::Device;
use crate::pipeline_key::{ComputePipelineKey, GraphicsPipelineKey};
use crate::program_cache::StageProgram;
use crate::regs::{Stage, MAX_GRAPHICS_STAGES};

pub struct GraphicsPipeline<D: Device> {
    key: GraphicsPipelineKey,
    handle: D::GraphicsPipeline,
    stages: [Option<StageProgram<D::ShaderModule>>; MAX_GRAPHICS_STAGES],
}

impl<D: Device> GraphicsPipeline<D> {
    pub(crate) fn new(
        key: GraphicsPipelineKey,
        handle: D::GraphicsPipeline,
        stages: [Option<StageProgram<D::ShaderModule>>; MAX_GRAPHICS_STAGES],
    ) -> Self {
        Self { key, handle, stages }
    }

    pub fn key(&self) -> &GraphicsPipelineKey {
        &self.key
    }

    pub fn handle(&self) -> &D::GraphicsPipeline {
        &self.handle
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageProgram<D::ShaderModule>> {
        self.stages.get(stage.index())?.as_ref()
    }

    /// Bound stages in binding order.
    pub fn stages(&self) -> impl Iterator<Item = (Stage, &StageProgram<D::ShaderModule>)> {
        Stage::GRAPHICS
            .into_iter()
            .zip(&self.stages)
            .filter_map(|(stage, program)| Some((stage, program.as_ref()?)))
    }
}

pub struct ComputePipeline<D: Device> {
    key: ComputePipelineKey,
    handle: D::ComputePipeline,
    stage: StageProgram<D::ShaderModule>,
}

impl<D: Device> ComputePipeline<D> {
    pub(crate) fn new(
        key: ComputePipelineKey,
        handle: D::ComputePipeline,
        stage: StageProgram<D::ShaderModule>,
    ) -> Self {
        Self { key, handle, stage }
    }

    pub fn key(&self) -> &ComputePipelineKey {
        &self.key
    }

    pub fn handle(&self) -> &D::ComputePipeline {
        &self.handle
    }

    pub fn stage(&self) -> &StageProgram<D::ShaderModule> {
        &self.stage
    }
}
