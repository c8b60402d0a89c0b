//! Pipeline key construction from the register snapshot.

use tracing::{trace, warn};

use crate::device::Device;
use crate::error::Result;
use crate::format::{adjust_color_buffer_format, depth_format, surface_format, Format};
use crate::pipeline_cache::PipelineCache;
use crate::pipeline_key::{ComputePipelineKey, GraphicsPipelineKey};
use crate::program_cache::StageProgram;
use crate::regs::{
    ColorControlMode, Regs, StencilFormat, Stage, SwapMode, ZFormat, NUM_COLOR_BUFFERS,
};
use crate::runtime_info::build_runtime_info;
use crate::skip::{draw_skip_reason, tessellation_requested, DrawSkipReason};
use crate::translate::{BindingAllocator, ShaderTranslator};

/// Hardware color slot to compacted attachment index, as assigned by the first pass.
type ColorRemap = [Option<usize>; NUM_COLOR_BUFFERS];

impl<D: Device, T: ShaderTranslator> PipelineCache<D, T> {
    /// Rebuild the graphics key from `regs`.
    ///
    /// Returns `Ok(false)` when nothing should be drawn: no-op color passes, patch or missing
    /// topology, tessellation, unsupported stages or color formats, invalid binaries and
    /// denylisted shaders.
    pub fn refresh_graphics_key(&mut self, device: &mut D, regs: &Regs) -> Result<bool> {
        self.graphics_key.reset();
        self.stages = Default::default();

        if let Some(reason) = draw_skip_reason(regs) {
            trace!(%reason, "skipping draw");
            return Ok(false);
        }
        if tessellation_requested(regs) {
            if !self.tessellation_warned {
                warn!("tessellation is not supported, skipping draws that use it");
                self.tessellation_warned = true;
            }
            trace!(reason = %DrawSkipReason::Tessellation, "skipping draw");
            return Ok(false);
        }

        let mut key = GraphicsPipelineKey::default();
        fill_fixed_function_state(&mut key, regs);
        let Some(remap) = compact_color_targets(&mut key, regs) else {
            return Ok(false);
        };

        let mut binding = BindingAllocator::new();
        for stage in Stage::GRAPHICS {
            if !regs.stage_enable.is_stage_enabled(stage) {
                continue;
            }
            let Some(pgm) = regs.program_for_stage(stage).filter(|pgm| pgm.is_bound()) else {
                continue;
            };
            if !pgm.binary_info.valid() {
                warn!(%stage, address = %format!("{:#x}", pgm.address), "invalid shader binary info");
                return Ok(false);
            }
            let params = pgm.params();
            if self.denylist.should_skip_shader(params.hash) {
                trace!(%stage, hash = %format!("{:#x}", params.hash), "skipping denylisted graphics shader");
                return Ok(false);
            }
            if stage != Stage::Vertex && stage != Stage::Fragment {
                trace!(%stage, "unsupported shader stage");
                return Ok(false);
            }

            let runtime_info = build_runtime_info(stage, regs, Some(&key), &self.caps);
            let program = self.fetch_program(device, stage, &params, runtime_info, &mut binding)?;
            key.stage_hashes[stage.index()] = program.hash;
            self.stages[stage.index()] = Some(program);
        }

        key.mrt_mask = self.stages[Stage::Fragment.index()]
            .as_ref()
            .map_or(0, |fs| self.programs.info(fs).mrt_mask);
        finish_color_targets(&mut key, regs, &remap);

        self.graphics_key = key;
        Ok(true)
    }

    /// Rebuild the compute key. Returns `Ok(false)` for denylisted shaders.
    pub fn refresh_compute_key(&mut self, device: &mut D, regs: &Regs) -> Result<bool> {
        Ok(self.resolve_compute_stage(device, regs)?.is_some())
    }

    /// Rebuild the compute key and hand back the program it was built from.
    pub(crate) fn resolve_compute_stage(
        &mut self,
        device: &mut D,
        regs: &Regs,
    ) -> Result<Option<StageProgram<D::ShaderModule>>> {
        self.compute_key = ComputePipelineKey::default();

        let params = regs.cs_program.program.params();
        if self.denylist.should_skip_shader(params.hash) {
            trace!(hash = %format!("{:#x}", params.hash), "skipping denylisted compute shader");
            return Ok(None);
        }

        let runtime_info = build_runtime_info(Stage::Compute, regs, None, &self.caps);
        let mut binding = BindingAllocator::new();
        let program =
            self.fetch_program(device, Stage::Compute, &params, runtime_info, &mut binding)?;
        self.compute_key = ComputePipelineKey(program.hash);
        Ok(Some(program))
    }
}

/// Depth, stencil and raster state that is copied from registers without compaction.
fn fill_fixed_function_state(key: &mut GraphicsPipelineKey, regs: &Regs) {
    let depth_buffer = regs.depth_buffer;
    let depth_valid = depth_buffer.z_format != ZFormat::Invalid;
    let stencil_valid = depth_buffer.stencil_format != StencilFormat::Invalid;
    let ds_format = depth_format(depth_buffer.z_format, depth_buffer.stencil_format);

    key.depth_format = if depth_valid { ds_format } else { Format::UNDEFINED };
    // Stencil shares the depth attachment.
    key.stencil_format = if stencil_valid {
        key.depth_format
    } else {
        Format::UNDEFINED
    };

    key.depth_stencil = regs.depth_control;
    if regs.depth_render_control.depth_clear_enable() != 0 {
        key.depth_stencil.set_depth_write_enable(0);
    }
    key.depth_stencil
        .set_depth_enable((key.depth_stencil.depth_enable() != 0 && depth_valid) as u32);
    let has_stencil = !key.stencil_format.is_undefined();
    key.depth_stencil
        .set_stencil_enable((key.depth_stencil.stencil_enable() != 0 && has_stencil) as u32);
    key.stencil = regs.stencil_control;

    let polygon = regs.polygon_control;
    key.depth_bias_enable = polygon.needs_bias() as u32;
    key.polygon_mode = polygon.poly_mode() as u32;
    key.cull_mode = polygon.culling_mode() as u32;
    key.front_face = polygon.front_face();
    key.clip_space = regs.clipper_control.clip_space() as u32;
    key.num_samples = regs.aa_config.num_samples();
    key.rop3 = regs.color_control.rop3();

    key.prim_type = regs.primitive_type as u32;
    key.enable_primitive_restart = regs.enable_primitive_restart & 1;
    key.primitive_restart_index = regs.primitive_restart_index;
}

/// Whether hardware slot `cb` takes part in color output at all.
fn color_slot_active(regs: &Regs, cb: usize) -> bool {
    regs.color_control.mode() != ColorControlMode::Disable
        && regs.color_buffers[cb].is_bound()
        && regs.color_target_mask.get_mask(cb) != 0
}

/// First pass: left-pack formats and swizzles of the active color buffers.
///
/// Returns `None` when an active buffer has a format the host cannot render to.
fn compact_color_targets(key: &mut GraphicsPipelineKey, regs: &Regs) -> Option<ColorRemap> {
    let mut remap = [None; NUM_COLOR_BUFFERS];
    let mut remapped = 0;
    for cb in 0..NUM_COLOR_BUFFERS {
        if !color_slot_active(regs, cb) {
            continue;
        }
        let info = regs.color_buffers[cb].info;
        let Some(base) = surface_format(info.format(), info.number_type()) else {
            warn!(
                cb,
                format = info.format(),
                number_type = info.number_type(),
                "unsupported color buffer format, skipping draw"
            );
            return None;
        };
        let adjusted = adjust_color_buffer_format(base, info.comp_swap());
        key.color_formats[remapped] = adjusted;
        // A swap already folded into the format must not be applied again by the shader.
        if adjusted == base {
            key.mrt_swizzles[remapped] = info.comp_swap() as u32;
        }
        remap[cb] = Some(remapped);
        remapped += 1;
    }
    Some(remap)
}

/// Second pass: keep only targets the fragment shader writes and fill their blend state.
///
/// Survivors are packed again in hardware slot order; everything after them is reset.
fn finish_color_targets(key: &mut GraphicsPipelineKey, regs: &Regs, remap: &ColorRemap) {
    let mut remapped = 0;
    for (cb, slot) in remap.iter().enumerate() {
        let Some(src) = *slot else {
            continue;
        };
        if key.mrt_mask & (1 << cb) == 0 {
            continue;
        }

        // src >= remapped, so moving down never clobbers an unvisited target.
        key.color_formats[remapped] = key.color_formats[src];
        key.mrt_swizzles[remapped] = key.mrt_swizzles[src];

        let mut blend = regs.blend_control[cb];
        if regs.color_buffers[cb].info.blend_bypass() != 0 {
            blend.set_enable(0);
        }
        key.blend_controls[remapped] = blend;
        key.write_masks[remapped] = regs.color_target_mask.get_mask(cb);
        key.cb_shader_mask
            .set_mask(remapped, regs.color_shader_mask.get_mask(cb));
        remapped += 1;
    }

    for slot in remapped..NUM_COLOR_BUFFERS {
        key.color_formats[slot] = Format::UNDEFINED;
        key.mrt_swizzles[slot] = SwapMode::Standard as u32;
    }
}
