//! Per-stage register state that shader translation depends on besides the bytecode itself.
//!
//! Extraction is a pure function of the register snapshot (plus the swizzles of the key being
//! built for fragment shaders) and is cheap enough to recompute on every lookup.

use crate::device::DeviceCapabilities;
use crate::pipeline_key::GraphicsPipelineKey;
use crate::regs::{ClipSpace, Regs, Stage, SwapMode, VsOutputControl, NUM_COLOR_BUFFERS};

/// Value routed to one component of a vertex shader misc/clip output vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VsOutput {
    #[default]
    None,
    PointSprite,
    EdgeFlag,
    KillFlag,
    GsCutFlag,
    GsMrtIndex,
    GsVpIndex,
    ClipDist(u8),
    CullDist(u8),
}

pub type VsOutputMap = [VsOutput; 4];

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VertexRuntimeInfo {
    pub outputs: Vec<VsOutputMap>,
    /// Remap depth from `[-w, w]` to `[0, w]` in the shader because the driver cannot.
    pub emulate_depth_negative_one_to_one: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PsInput {
    pub param_index: u8,
    pub is_default: bool,
    pub is_flat: bool,
    pub default_value: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FragmentRuntimeInfo {
    pub mrt_swizzles: [SwapMode; NUM_COLOR_BUFFERS],
    pub inputs: Vec<PsInput>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ComputeRuntimeInfo {
    pub workgroup_size: [u32; 3],
    pub tgid_enable: [bool; 3],
    pub shared_memory_size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StageRuntimeInfo {
    Vertex(VertexRuntimeInfo),
    Fragment(FragmentRuntimeInfo),
    Compute(ComputeRuntimeInfo),
    None,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuntimeInfo {
    pub stage: Stage,
    pub num_user_data: u32,
    pub num_input_vgprs: u32,
    pub num_allocated_vgprs: u32,
    pub stage_info: StageRuntimeInfo,
}

impl RuntimeInfo {
    pub fn vs_info(&self) -> Option<&VertexRuntimeInfo> {
        match &self.stage_info {
            StageRuntimeInfo::Vertex(info) => Some(info),
            _ => None,
        }
    }

    pub fn fs_info(&self) -> Option<&FragmentRuntimeInfo> {
        match &self.stage_info {
            StageRuntimeInfo::Fragment(info) => Some(info),
            _ => None,
        }
    }

    pub fn cs_info(&self) -> Option<&ComputeRuntimeInfo> {
        match &self.stage_info {
            StageRuntimeInfo::Compute(info) => Some(info),
            _ => None,
        }
    }
}

fn push_output(outputs: &mut Vec<VsOutputMap>, map: VsOutputMap) {
    if map.iter().any(|&out| out != VsOutput::None) {
        outputs.push(map);
    }
}

fn clip_or_cull(ctl: VsOutputControl, index: u32) -> VsOutput {
    if ctl.is_clip_dist_enabled(index) {
        VsOutput::ClipDist(index as u8)
    } else if ctl.is_cull_dist_enabled(index) {
        VsOutput::CullDist(index as u8)
    } else {
        VsOutput::None
    }
}

/// Collect the misc and the two clip/cull distance output vectors, skipping empty ones.
pub fn gather_vertex_outputs(ctl: VsOutputControl) -> Vec<VsOutputMap> {
    let flag = |bit: u32, out: VsOutput| if bit != 0 { out } else { VsOutput::None };
    let mut outputs = Vec::new();

    // VS_OUT_MISC_VEC
    let edge_or_cut = match flag(ctl.use_vtx_edge_flag(), VsOutput::EdgeFlag) {
        VsOutput::None => flag(ctl.use_vtx_gs_cut_flag(), VsOutput::GsCutFlag),
        out => out,
    };
    let kill_or_rt = match flag(ctl.use_vtx_kill_flag(), VsOutput::KillFlag) {
        VsOutput::None => flag(ctl.use_vtx_render_target_idx(), VsOutput::GsMrtIndex),
        out => out,
    };
    push_output(
        &mut outputs,
        [
            flag(ctl.use_vtx_point_size(), VsOutput::PointSprite),
            edge_or_cut,
            kill_or_rt,
            flag(ctl.use_vtx_viewport_idx(), VsOutput::GsVpIndex),
        ],
    );

    // VS_OUT_CCDIST0 / VS_OUT_CCDIST1
    for base in [0, 4] {
        push_output(
            &mut outputs,
            [
                clip_or_cull(ctl, base),
                clip_or_cull(ctl, base + 1),
                clip_or_cull(ctl, base + 2),
                clip_or_cull(ctl, base + 3),
            ],
        );
    }

    outputs
}

/// Build the runtime info for `stage`.
///
/// `key` supplies the MRT swizzles computed by the first color compaction pass; fragment
/// shaders see standard swizzles when it is `None`.
pub fn build_runtime_info(
    stage: Stage,
    regs: &Regs,
    key: Option<&GraphicsPipelineKey>,
    caps: &DeviceCapabilities,
) -> RuntimeInfo {
    let settings = regs
        .program_for_stage(stage)
        .map(|pgm| pgm.settings)
        .unwrap_or_default();
    let mut info = RuntimeInfo {
        stage,
        num_user_data: settings.num_user_regs(),
        num_input_vgprs: 0,
        num_allocated_vgprs: settings.num_vgprs() * 4,
        stage_info: StageRuntimeInfo::None,
    };

    match stage {
        Stage::Vertex => {
            info.num_input_vgprs = settings.vgpr_comp_cnt();
            info.stage_info = StageRuntimeInfo::Vertex(VertexRuntimeInfo {
                outputs: gather_vertex_outputs(regs.vs_output_control),
                emulate_depth_negative_one_to_one: !caps.depth_clip_control
                    && regs.clipper_control.clip_space() == ClipSpace::MinusWToW,
            });
        }
        Stage::Fragment => {
            let mut mrt_swizzles = [SwapMode::Standard; NUM_COLOR_BUFFERS];
            if let Some(key) = key {
                for (slot, swizzle) in mrt_swizzles.iter_mut().enumerate() {
                    *swizzle = key.mrt_swizzle(slot);
                }
            }
            let inputs = regs
                .ps_inputs
                .iter()
                .take(regs.num_interp as usize)
                .map(|input| PsInput {
                    param_index: input.input_offset() as u8,
                    is_default: input.use_default() != 0,
                    is_flat: input.flat_shade() != 0,
                    default_value: input.default_value() as u8,
                })
                .collect();
            info.stage_info = StageRuntimeInfo::Fragment(FragmentRuntimeInfo {
                mrt_swizzles,
                inputs,
            });
        }
        Stage::Compute => {
            let cs = &regs.cs_program;
            info.stage_info = StageRuntimeInfo::Compute(ComputeRuntimeInfo {
                workgroup_size: [cs.num_thread_x, cs.num_thread_y, cs.num_thread_z],
                tgid_enable: [
                    cs.is_tgid_enabled(0),
                    cs.is_tgid_enabled(1),
                    cs.is_tgid_enabled(2),
                ],
                shared_memory_size: cs.shared_mem_size(),
            });
        }
        Stage::Geometry | Stage::Export | Stage::Hull | Stage::Local => {}
    }

    info
}
