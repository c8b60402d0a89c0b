//! Shared fakes for `aero-gcn-pipeline` integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use aero_gcn_pipeline::device::{ComputePipelineDesc, GraphicsPipelineDesc};
use aero_gcn_pipeline::format::{data_format, number_format};
use aero_gcn_pipeline::regs::{
    BinaryInfo, ColorBuffer, PrimitiveType, Regs, ShaderProgram, Stage, SwapMode,
};
use aero_gcn_pipeline::runtime_info::RuntimeInfo;
use aero_gcn_pipeline::{
    BindingAllocator, ComputePipelineKey, Device, DeviceCapabilities, DeviceError,
    GraphicsPipelineKey, Profile, ShaderInfo, ShaderTranslator, TranslateError,
};

pub const VS_HASH: u64 = 0x1111_2222_3333_4444;
pub const PS_HASH: u64 = 0x5555_6666_7777_8888;
pub const CS_HASH: u64 = 0x9999_aaaa_bbbb_cccc;

pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Route `tracing` output through the test harness so warnings show up on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// In-memory sink for formatted `tracing` output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with warnings and errors on this thread collected into the returned string.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}

/// Device that hands out sequential ids and records what it was asked to create.
#[derive(Debug, Default)]
pub struct FakeDevice {
    pub caps: DeviceCapabilities,
    pub modules: Vec<Vec<u32>>,
    pub names: Vec<(u32, String)>,
    pub graphics_pipelines: Vec<GraphicsPipelineKey>,
    /// Stage hashes seen by each graphics pipeline creation.
    pub graphics_stage_hashes: Vec<Vec<(Stage, u64)>>,
    pub compute_pipelines: Vec<ComputePipelineKey>,
    pub fail_pipelines: bool,
}

impl Device for FakeDevice {
    type ShaderModule = u32;
    type GraphicsPipeline = u32;
    type ComputePipeline = u32;

    fn capabilities(&self) -> DeviceCapabilities {
        self.caps
    }

    fn create_shader_module(&mut self, code: &[u32]) -> Result<u32, DeviceError> {
        self.modules.push(code.to_vec());
        Ok(self.modules.len() as u32)
    }

    fn set_object_name(&mut self, module: &u32, name: &str) {
        self.names.push((*module, name.to_owned()));
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc<'_, u32>,
    ) -> Result<u32, DeviceError> {
        if self.fail_pipelines {
            return Err(DeviceError::Rejected("graphics pipeline".into()));
        }
        self.graphics_pipelines.push(*desc.key);
        self.graphics_stage_hashes.push(
            desc.stages
                .iter()
                .flatten()
                .map(|stage| (stage.stage, stage.info.pgm_hash))
                .collect(),
        );
        Ok(self.graphics_pipelines.len() as u32)
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDesc<'_, u32>,
    ) -> Result<u32, DeviceError> {
        if self.fail_pipelines {
            return Err(DeviceError::Rejected("compute pipeline".into()));
        }
        self.compute_pipelines.push(*desc.key);
        Ok(self.compute_pipelines.len() as u32)
    }
}

/// Per-shader behaviour of [`FakeTranslator`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FakeShader {
    pub mrt_mask: u32,
    pub num_buffers: u32,
}

pub struct FakeProgram {
    hash: u64,
    bindings: u32,
}

/// Deterministic translator: output depends only on the content hash and the binding cursor.
#[derive(Debug, Default)]
pub struct FakeTranslator {
    pub shaders: HashMap<u64, FakeShader>,
    /// Content hash and runtime info of every `translate` call.
    pub translated: Vec<(u64, RuntimeInfo)>,
}

impl FakeTranslator {
    pub fn with_shader(mut self, hash: u64, shader: FakeShader) -> Self {
        self.shaders.insert(hash, shader);
        self
    }

    pub fn translated_hashes(&self) -> Vec<u64> {
        self.translated.iter().map(|(hash, _)| *hash).collect()
    }
}

impl ShaderTranslator for FakeTranslator {
    type Program = FakeProgram;

    fn translate(
        &mut self,
        code: &[u32],
        info: &mut ShaderInfo,
        runtime_info: &RuntimeInfo,
        _profile: &Profile,
    ) -> Result<FakeProgram, TranslateError> {
        if code.is_empty() {
            return Err(TranslateError::Malformed("empty program".into()));
        }
        self.translated.push((info.pgm_hash, runtime_info.clone()));
        let shader = self.shaders.get(&info.pgm_hash).copied().unwrap_or_default();
        info.mrt_mask = shader.mrt_mask;
        info.num_buffers = shader.num_buffers;
        Ok(FakeProgram {
            hash: info.pgm_hash,
            bindings: info.num_bindings(),
        })
    }

    fn emit(
        &mut self,
        _profile: &Profile,
        _runtime_info: &RuntimeInfo,
        program: FakeProgram,
        binding: &mut BindingAllocator,
    ) -> Result<Vec<u32>, TranslateError> {
        let start = binding.current();
        binding.advance(program.bindings);
        Ok(vec![
            SPIRV_MAGIC,
            program.hash as u32,
            (program.hash >> 32) as u32,
            start,
        ])
    }
}

pub fn program(address: u64, hash: u64) -> ShaderProgram {
    ShaderProgram {
        address,
        code: vec![0xbf81_0000, hash as u32],
        binary_info: BinaryInfo::new(hash, 8),
        ..ShaderProgram::default()
    }
}

pub fn bind_color(regs: &mut Regs, cb: usize, number: u32) {
    regs.color_buffers[cb] = ColorBuffer {
        base_address: 0x8000_0000 + 0x10_0000 * cb as u64,
        ..ColorBuffer::default()
    };
    let info = &mut regs.color_buffers[cb].info;
    info.set_format(data_format::COLOR_8_8_8_8);
    info.set_number_type(number);
    info.set_comp_swap_raw(SwapMode::Standard as u32);
    regs.color_target_mask.set_mask(cb, 0xF);
    regs.color_shader_mask.set_mask(cb, 0xF);
}

/// A triangle list draw with a vertex and pixel shader writing color target 0.
pub fn draw_regs() -> Regs {
    let mut regs = Regs::default();
    regs.primitive_type = PrimitiveType::TriangleList;
    regs.color_control.set_mode_raw(1);
    regs.vs_program = program(0x1000, VS_HASH);
    regs.ps_program = program(0x2000, PS_HASH);
    bind_color(&mut regs, 0, number_format::UNORM);
    regs
}

pub fn compute_regs() -> Regs {
    let mut regs = Regs::default();
    regs.cs_program.program = program(0x3000, CS_HASH);
    regs.cs_program.num_thread_x = 64;
    regs.cs_program.num_thread_y = 1;
    regs.cs_program.num_thread_z = 1;
    regs
}

/// Translator where the pixel shader writes target 0 and each shader uses one buffer.
pub fn translator() -> FakeTranslator {
    FakeTranslator::default()
        .with_shader(
            VS_HASH,
            FakeShader {
                mrt_mask: 0,
                num_buffers: 1,
            },
        )
        .with_shader(
            PS_HASH,
            FakeShader {
                mrt_mask: 0b1,
                num_buffers: 1,
            },
        )
        .with_shader(
            CS_HASH,
            FakeShader {
                mrt_mask: 0,
                num_buffers: 2,
            },
        )
}
