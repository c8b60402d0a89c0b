//! Pipeline object cache.
//!
//! Owns every shader module and pipeline object it creates. Pipelines live in contiguous `Vec`s
//! addressed through the lookup maps, so a reference handed out by
//! [`PipelineCache::get_graphics_pipeline`] always points at the single object for that key.

use hashbrown::HashMap;
use tracing::debug;

use crate::config::PipelineCacheConfig;
use crate::device::{
    ComputePipelineDesc, Device, DeviceCapabilities, GraphicsPipelineDesc, PipelineStage,
};
use crate::dump::ShaderDumper;
use crate::error::{PipelineError, Result};
use crate::pipeline::{ComputePipeline, GraphicsPipeline};
use crate::pipeline_key::{ComputePipelineKey, GraphicsPipelineKey};
use crate::program_cache::{Compiler, ShaderProgramCache, StageProgram};
use crate::regs::{Regs, ShaderParams, Stage, MAX_GRAPHICS_STAGES};
use crate::runtime_info::RuntimeInfo;
use crate::skip::ShaderDenylist;
use crate::stats::PipelineCacheStats;
use crate::translate::{BindingAllocator, Profile, ShaderTranslator};

pub struct PipelineCache<D: Device, T: ShaderTranslator> {
    pub(crate) caps: DeviceCapabilities,
    pub(crate) profile: Profile,
    pub(crate) translator: T,
    pub(crate) denylist: ShaderDenylist,
    pub(crate) dumper: ShaderDumper,
    pub(crate) programs: ShaderProgramCache<D::ShaderModule>,

    pub(crate) graphics_key: GraphicsPipelineKey,
    pub(crate) compute_key: ComputePipelineKey,
    pub(crate) stages: [Option<StageProgram<D::ShaderModule>>; MAX_GRAPHICS_STAGES],

    graphics_pipelines: Vec<GraphicsPipeline<D>>,
    graphics_lookup: HashMap<GraphicsPipelineKey, usize>,
    compute_pipelines: Vec<ComputePipeline<D>>,
    compute_lookup: HashMap<ComputePipelineKey, usize>,

    /// Tessellation is reported once per cache instance, not once per draw.
    pub(crate) tessellation_warned: bool,

    graphics_hits: u64,
    compute_hits: u64,
    skipped_draws: u64,
    skipped_dispatches: u64,
}

impl<D: Device, T: ShaderTranslator> PipelineCache<D, T> {
    /// Capabilities are read from `device` here and never again.
    pub fn new(device: &D, config: PipelineCacheConfig, translator: T) -> Self {
        let caps = device.capabilities();
        Self {
            caps,
            profile: Profile::from_capabilities(&caps),
            translator,
            denylist: ShaderDenylist::new(config.skip_shader_hashes.iter().copied()),
            dumper: ShaderDumper::new(config.dump_shaders, config.dump_dir),
            programs: ShaderProgramCache::new(),
            graphics_key: GraphicsPipelineKey::default(),
            compute_key: ComputePipelineKey::default(),
            stages: Default::default(),
            graphics_pipelines: Vec::new(),
            graphics_lookup: HashMap::new(),
            compute_pipelines: Vec::new(),
            compute_lookup: HashMap::new(),
            tessellation_warned: false,
            graphics_hits: 0,
            compute_hits: 0,
            skipped_draws: 0,
            skipped_dispatches: 0,
        }
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.caps
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    pub fn programs(&self) -> &ShaderProgramCache<D::ShaderModule> {
        &self.programs
    }

    /// Key produced by the last successful graphics refresh.
    pub fn graphics_key(&self) -> &GraphicsPipelineKey {
        &self.graphics_key
    }

    pub fn compute_key(&self) -> ComputePipelineKey {
        self.compute_key
    }

    /// Pipeline for the current draw, or `None` when the draw must be skipped.
    pub fn get_graphics_pipeline(
        &mut self,
        device: &mut D,
        regs: &Regs,
    ) -> Result<Option<&GraphicsPipeline<D>>> {
        if !self.refresh_graphics_key(device, regs)? {
            self.skipped_draws += 1;
            return Ok(None);
        }

        let key = self.graphics_key;
        let index = match self.graphics_lookup.get(&key) {
            Some(&index) => {
                self.graphics_hits += 1;
                index
            }
            None => {
                let stages: [Option<PipelineStage<'_, D::ShaderModule>>; MAX_GRAPHICS_STAGES] =
                    std::array::from_fn(|i| {
                        self.stages[i].as_ref().map(|sp| PipelineStage {
                            stage: Stage::GRAPHICS[i],
                            info: self.programs.info(sp),
                            module: &sp.module,
                        })
                    });
                let desc = GraphicsPipelineDesc { key: &key, stages };
                let handle = device
                    .create_graphics_pipeline(&desc)
                    .map_err(|source| PipelineError::CreatePipeline {
                        kind: "graphics",
                        source,
                    })?;

                let index = self.graphics_pipelines.len();
                debug!(
                    index,
                    num_color_targets = key.num_color_targets(),
                    "created graphics pipeline"
                );
                self.graphics_pipelines
                    .push(GraphicsPipeline::new(key, handle, self.stages.clone()));
                self.graphics_lookup.insert(key, index);
                index
            }
        };
        Ok(Some(&self.graphics_pipelines[index]))
    }

    /// Pipeline for the current dispatch, or `None` when the dispatch must be skipped.
    pub fn get_compute_pipeline(
        &mut self,
        device: &mut D,
        regs: &Regs,
    ) -> Result<Option<&ComputePipeline<D>>> {
        let Some(stage) = self.resolve_compute_stage(device, regs)? else {
            self.skipped_dispatches += 1;
            return Ok(None);
        };

        let key = self.compute_key;
        let index = match self.compute_lookup.get(&key) {
            Some(&index) => {
                self.compute_hits += 1;
                index
            }
            None => {
                let desc = ComputePipelineDesc {
                    key: &key,
                    stage: PipelineStage {
                        stage: Stage::Compute,
                        info: self.programs.info(&stage),
                        module: &stage.module,
                    },
                };
                let handle = device
                    .create_compute_pipeline(&desc)
                    .map_err(|source| PipelineError::CreatePipeline {
                        kind: "compute",
                        source,
                    })?;

                let index = self.compute_pipelines.len();
                debug!(index, hash = %format!("{:#x}", key.0), "created compute pipeline");
                self.compute_pipelines
                    .push(ComputePipeline::new(key, handle, stage));
                self.compute_lookup.insert(key, index);
                index
            }
        };
        Ok(Some(&self.compute_pipelines[index]))
    }

    pub fn stats(&self) -> PipelineCacheStats {
        let graphics_pipelines = self.graphics_pipelines.len() as u64;
        let compute_pipelines = self.compute_pipelines.len() as u64;
        PipelineCacheStats {
            shader_module_hits: self.programs.hits(),
            shader_module_misses: self.programs.misses(),
            shader_modules: self.programs.num_modules() as u64,
            programs: self.programs.num_programs() as u64,
            graphics_pipeline_hits: self.graphics_hits,
            graphics_pipeline_misses: graphics_pipelines,
            graphics_pipelines,
            compute_pipeline_hits: self.compute_hits,
            compute_pipeline_misses: compute_pipelines,
            compute_pipelines,
            skipped_draws: self.skipped_draws,
            skipped_dispatches: self.skipped_dispatches,
        }
    }

    /// Look up (or compile) the program for one stage of the key being built.
    pub(crate) fn fetch_program(
        &mut self,
        device: &mut D,
        stage: Stage,
        params: &ShaderParams<'_>,
        runtime_info: RuntimeInfo,
        binding: &mut BindingAllocator,
    ) -> Result<StageProgram<D::ShaderModule>> {
        let mut compiler = Compiler {
            device,
            translator: &mut self.translator,
            profile: &self.profile,
            dumper: &self.dumper,
        };
        self.programs
            .get_program(&mut compiler, stage, params, runtime_info, binding)
    }
}
