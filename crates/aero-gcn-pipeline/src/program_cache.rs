//! Two-level shader program cache.
//!
//! Programs are keyed by the guest bytecode content hash. Each program owns a list of
//! permutations, one per distinct [`StageSpecialization`] it was compiled for. Lookups return a
//! dedup hash (`hash_combine(content_hash, perm_idx)`) that pipeline keys store in place of the
//! module itself.

use hashbrown::HashMap;
use tracing::info;

use crate::device::Device;
use crate::dump::ShaderDumper;
use crate::error::{PipelineError, Result};
use crate::regs::{ShaderParams, Stage};
use crate::runtime_info::RuntimeInfo;
use crate::translate::{BindingAllocator, Profile, ShaderInfo, ShaderTranslator};

/// Mix a permutation index into a content hash.
pub const fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Handle to a [`Program`] owned by a [`ShaderProgramCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) u32);

impl ProgramId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Everything besides the bytecode that changes what translation produces.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StageSpecialization {
    pub stage: Stage,
    pub runtime_info: RuntimeInfo,
    /// Binding cursor value when the permutation was compiled.
    pub start_binding: u32,
}

#[derive(Clone, Debug)]
pub struct Permutation<M> {
    pub module: M,
    /// What the translator reported for this permutation.
    pub info: ShaderInfo,
    pub specialization: StageSpecialization,
}

#[derive(Clone, Debug)]
pub struct Program<M> {
    pub permutations: Vec<Permutation<M>>,
}

/// Result of a program lookup for one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageProgram<M> {
    pub program: ProgramId,
    pub perm_idx: usize,
    pub module: M,
    /// Content hash combined with the permutation index.
    pub hash: u64,
}

/// Borrowed collaborators needed to compile a permutation.
pub struct Compiler<'a, D: Device, T: ShaderTranslator> {
    pub device: &'a mut D,
    pub translator: &'a mut T,
    pub profile: &'a Profile,
    pub dumper: &'a ShaderDumper,
}

impl<D: Device, T: ShaderTranslator> Compiler<'_, D, T> {
    /// Translate `code` and create a native module for it.
    ///
    /// `info` is overwritten with what the translator learned about the program and `binding`
    /// is advanced past the bindings it allocated.
    pub fn compile_module(
        &mut self,
        info: &mut ShaderInfo,
        code: &[u32],
        runtime_info: &RuntimeInfo,
        binding: &mut BindingAllocator,
        perm_idx: usize,
    ) -> Result<D::ShaderModule> {
        let stage = info.stage;
        let hash = info.pgm_hash;
        info!(
            %stage,
            hash = %format!("{hash:#x}"),
            perm_idx,
            "compiling shader"
        );

        self.dumper.dump(stage, hash, perm_idx, "bin", code);

        let program = self
            .translator
            .translate(code, info, runtime_info, self.profile)
            .map_err(|source| PipelineError::Translate { stage, hash, source })?;
        let spv = self
            .translator
            .emit(self.profile, runtime_info, program, binding)
            .map_err(|source| PipelineError::Translate { stage, hash, source })?;

        self.dumper.dump(stage, hash, perm_idx, "spv", &spv);

        let module = self.device.create_shader_module(&spv).map_err(|source| {
            PipelineError::CreateShaderModule {
                stage,
                hash,
                perm_idx,
                source,
            }
        })?;
        self.device
            .set_object_name(&module, &format!("{stage}_{hash:#x}_{perm_idx}"));
        Ok(module)
    }
}

#[derive(Debug)]
pub struct ShaderProgramCache<M> {
    programs: Vec<Program<M>>,
    lookup: HashMap<u64, ProgramId>,
    hits: u64,
    misses: u64,
}

impl<M> Default for ShaderProgramCache<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ShaderProgramCache<M> {
    pub fn new() -> Self {
        Self {
            programs: Vec::new(),
            lookup: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self, id: ProgramId) -> &Program<M> {
        &self.programs[id.index()]
    }

    /// Shader info of the permutation `stage` was resolved to.
    pub fn info(&self, stage: &StageProgram<M>) -> &ShaderInfo {
        &self.program(stage.program).permutations[stage.perm_idx].info
    }

    pub fn find(&self, hash: u64) -> Option<ProgramId> {
        self.lookup.get(&hash).copied()
    }

    pub fn num_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn num_modules(&self) -> usize {
        self.programs.iter().map(|p| p.permutations.len()).sum()
    }

    /// Lookups that reused an existing permutation.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that compiled a new permutation.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl<M: Clone> ShaderProgramCache<M> {
    /// Resolve the module for `params`, compiling a new program or permutation when needed.
    ///
    /// Nothing is inserted when compilation fails.
    pub fn get_program<D, T>(
        &mut self,
        compiler: &mut Compiler<'_, D, T>,
        stage: Stage,
        params: &ShaderParams<'_>,
        runtime_info: RuntimeInfo,
        binding: &mut BindingAllocator,
    ) -> Result<StageProgram<M>>
    where
        D: Device<ShaderModule = M>,
        T: ShaderTranslator,
    {
        let specialization = StageSpecialization {
            stage,
            runtime_info,
            start_binding: binding.current(),
        };

        let Some(id) = self.find(params.hash) else {
            let mut info = ShaderInfo::new(stage, params);
            let module = compiler.compile_module(
                &mut info,
                params.code,
                &specialization.runtime_info,
                binding,
                0,
            )?;
            let id = ProgramId(self.programs.len() as u32);
            self.programs.push(Program {
                permutations: vec![Permutation {
                    module: module.clone(),
                    info,
                    specialization,
                }],
            });
            self.lookup.insert(params.hash, id);
            self.misses += 1;
            return Ok(StageProgram {
                program: id,
                perm_idx: 0,
                module,
                hash: hash_combine(params.hash, 0),
            });
        };

        let program = &mut self.programs[id.index()];
        let existing = program
            .permutations
            .iter()
            .position(|perm| perm.specialization == specialization);
        let (module, perm_idx) = match existing {
            Some(perm_idx) => {
                let perm = &program.permutations[perm_idx];
                binding.advance(perm.info.num_bindings());
                self.hits += 1;
                (perm.module.clone(), perm_idx)
            }
            None => {
                let perm_idx = program.permutations.len();
                let mut info = ShaderInfo::new(stage, params);
                let module = compiler.compile_module(
                    &mut info,
                    params.code,
                    &specialization.runtime_info,
                    binding,
                    perm_idx,
                )?;
                program.permutations.push(Permutation {
                    module: module.clone(),
                    info,
                    specialization,
                });
                self.misses += 1;
                (module, perm_idx)
            }
        };

        Ok(StageProgram {
            program: id,
            perm_idx,
            module,
            hash: hash_combine(params.hash, perm_idx as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        ComputePipelineDesc, DeviceCapabilities, DeviceError, GraphicsPipelineDesc,
    };
    use crate::runtime_info::StageRuntimeInfo;
    use crate::translate::TranslateError;

    #[derive(Default)]
    struct CountingDevice {
        modules: u32,
    }

    impl Device for CountingDevice {
        type ShaderModule = u32;
        type GraphicsPipeline = ();
        type ComputePipeline = ();

        fn capabilities(&self) -> DeviceCapabilities {
            DeviceCapabilities::default()
        }

        fn create_shader_module(&mut self, _code: &[u32]) -> std::result::Result<u32, DeviceError> {
            self.modules += 1;
            Ok(self.modules)
        }

        fn create_graphics_pipeline(
            &mut self,
            _desc: &GraphicsPipelineDesc<'_, u32>,
        ) -> std::result::Result<(), DeviceError> {
            Ok(())
        }

        fn create_compute_pipeline(
            &mut self,
            _desc: &ComputePipelineDesc<'_, u32>,
        ) -> std::result::Result<(), DeviceError> {
            Ok(())
        }
    }

    /// Every program uses two buffers.
    struct TwoBuffers;

    impl ShaderTranslator for TwoBuffers {
        type Program = ();

        fn translate(
            &mut self,
            _code: &[u32],
            info: &mut ShaderInfo,
            _runtime_info: &RuntimeInfo,
            _profile: &Profile,
        ) -> std::result::Result<(), TranslateError> {
            info.num_buffers = 2;
            Ok(())
        }

        fn emit(
            &mut self,
            _profile: &Profile,
            _runtime_info: &RuntimeInfo,
            _program: (),
            binding: &mut BindingAllocator,
        ) -> std::result::Result<Vec<u32>, TranslateError> {
            binding.advance(2);
            Ok(vec![0x0723_0203])
        }
    }

    /// Uses one buffer per user data register, so permutations differ in binding count.
    struct BuffersFromUserData;

    impl ShaderTranslator for BuffersFromUserData {
        type Program = u32;

        fn translate(
            &mut self,
            _code: &[u32],
            info: &mut ShaderInfo,
            runtime_info: &RuntimeInfo,
            _profile: &Profile,
        ) -> std::result::Result<u32, TranslateError> {
            info.num_buffers = runtime_info.num_user_data;
            Ok(info.num_bindings())
        }

        fn emit(
            &mut self,
            _profile: &Profile,
            _runtime_info: &RuntimeInfo,
            bindings: u32,
            binding: &mut BindingAllocator,
        ) -> std::result::Result<Vec<u32>, TranslateError> {
            binding.advance(bindings);
            Ok(vec![0x0723_0203])
        }
    }

    fn runtime_info(num_user_data: u32) -> RuntimeInfo {
        RuntimeInfo {
            stage: Stage::Vertex,
            num_user_data,
            num_input_vgprs: 0,
            num_allocated_vgprs: 0,
            stage_info: StageRuntimeInfo::None,
        }
    }

    #[test]
    fn hash_combine_separates_permutations() {
        let seed = 0x1234_5678_9abc_def0;
        assert_ne!(hash_combine(seed, 0), hash_combine(seed, 1));
        assert_eq!(hash_combine(seed, 1), hash_combine(seed, 1));
        assert_eq!(hash_combine(0, 0), 0x9e37_79b9);
    }

    #[test]
    fn permutations_follow_specialization_equality() {
        let mut device = CountingDevice::default();
        let mut translator = TwoBuffers;
        let profile = Profile::from_capabilities(&DeviceCapabilities::default());
        let dumper = ShaderDumper::disabled();
        let mut compiler = Compiler {
            device: &mut device,
            translator: &mut translator,
            profile: &profile,
            dumper: &dumper,
        };
        let mut cache = ShaderProgramCache::new();
        let params = ShaderParams {
            hash: 0xfeed,
            code: &[1, 2, 3],
            user_data: &[],
        };

        let mut binding = BindingAllocator::new();
        let first = cache
            .get_program(&mut compiler, Stage::Vertex, &params, runtime_info(4), &mut binding)
            .unwrap();
        assert_eq!(binding.current(), 2);
        assert_eq!(first.hash, hash_combine(0xfeed, 0));

        // Same specialization: reuse, binding still advances.
        let mut binding = BindingAllocator::new();
        let again = cache
            .get_program(&mut compiler, Stage::Vertex, &params, runtime_info(4), &mut binding)
            .unwrap();
        assert_eq!(again, first);
        assert_eq!(binding.current(), 2);

        // Different start binding: new permutation.
        let mut binding = BindingAllocator::new();
        binding.advance(5);
        let shifted = cache
            .get_program(&mut compiler, Stage::Vertex, &params, runtime_info(4), &mut binding)
            .unwrap();
        assert_eq!(shifted.hash, hash_combine(0xfeed, 1));
        assert_ne!(shifted.module, first.module);
        assert_eq!(binding.current(), 7);

        assert_eq!(cache.num_programs(), 1);
        assert_eq!(cache.num_modules(), 2);
        assert_eq!((cache.hits(), cache.misses()), (1, 2));
        assert_eq!(cache.info(&first).num_buffers, 2);
    }

    #[test]
    fn each_permutation_keeps_its_own_info() {
        let mut device = CountingDevice::default();
        let mut translator = BuffersFromUserData;
        let profile = Profile::from_capabilities(&DeviceCapabilities::default());
        let dumper = ShaderDumper::disabled();
        let mut compiler = Compiler {
            device: &mut device,
            translator: &mut translator,
            profile: &profile,
            dumper: &dumper,
        };
        let mut cache = ShaderProgramCache::new();
        let params = ShaderParams {
            hash: 0xbeef,
            code: &[1],
            user_data: &[],
        };

        let mut binding = BindingAllocator::new();
        let narrow = cache
            .get_program(&mut compiler, Stage::Vertex, &params, runtime_info(1), &mut binding)
            .unwrap();
        let mut binding = BindingAllocator::new();
        let wide = cache
            .get_program(&mut compiler, Stage::Vertex, &params, runtime_info(3), &mut binding)
            .unwrap();
        assert_eq!((narrow.perm_idx, wide.perm_idx), (0, 1));
        assert_eq!(cache.info(&narrow).num_buffers, 1);
        assert_eq!(cache.info(&wide).num_buffers, 3);

        // A hit on the first permutation advances by its own binding count.
        let mut binding = BindingAllocator::new();
        let again = cache
            .get_program(&mut compiler, Stage::Vertex, &params, runtime_info(1), &mut binding)
            .unwrap();
        assert_eq!(again, narrow);
        assert_eq!(binding.current(), 1);
    }
}
