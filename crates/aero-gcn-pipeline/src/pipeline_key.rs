//! Canonical pipeline keys.
//!
//! [`GraphicsPipelineKey`] is plain old data: it is zeroed before every refresh, compared byte
//! for byte and hashed over its raw bytes, so two keys are equal exactly when every register
//! field that feeds pipeline creation is equal.

use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use xxhash_rust::xxh3::xxh3_64;

use crate::format::Format;
use crate::regs::{
    BlendControl, ColorMask, DepthControl, StencilControl, SwapMode, MAX_GRAPHICS_STAGES,
    NUM_COLOR_BUFFERS,
};

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u32 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GraphicsPipelineKey {
    /// Dedup hash of the shader permutation bound to each graphics stage (0 = unused stage).
    pub stage_hashes: [u64; MAX_GRAPHICS_STAGES],
    /// Compacted color attachment formats.
    pub color_formats: [Format; NUM_COLOR_BUFFERS],
    pub blend_controls: [BlendControl; NUM_COLOR_BUFFERS],
    /// [`ColorWriteMask`] bits per compacted target.
    pub write_masks: [u32; NUM_COLOR_BUFFERS],
    /// Raw [`SwapMode`] per compacted target.
    pub mrt_swizzles: [u32; NUM_COLOR_BUFFERS],
    pub cb_shader_mask: ColorMask,
    /// Render targets written by the fragment shader, indexed by hardware slot.
    pub mrt_mask: u32,
    pub depth_stencil: DepthControl,
    pub stencil: StencilControl,
    pub depth_format: Format,
    pub stencil_format: Format,
    pub depth_bias_enable: u32,
    pub prim_type: u32,
    pub enable_primitive_restart: u32,
    pub primitive_restart_index: u32,
    pub polygon_mode: u32,
    pub cull_mode: u32,
    pub clip_space: u32,
    pub front_face: u32,
    pub num_samples: u32,
    pub rop3: u32,
}

impl GraphicsPipelineKey {
    pub fn reset(&mut self) {
        *self = Self::zeroed();
    }

    pub fn write_mask(&self, target: usize) -> ColorWriteMask {
        ColorWriteMask::from_bits_truncate(self.write_masks[target])
    }

    pub fn mrt_swizzle(&self, target: usize) -> SwapMode {
        SwapMode::from_raw(self.mrt_swizzles[target])
    }

    /// Number of leading color targets with a concrete format.
    pub fn num_color_targets(&self) -> usize {
        self.color_formats
            .iter()
            .take_while(|format| !format.is_undefined())
            .count()
    }
}

impl Default for GraphicsPipelineKey {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl PartialEq for GraphicsPipelineKey {
    fn eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

impl Eq for GraphicsPipelineKey {}

impl Hash for GraphicsPipelineKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(xxh3_64(bytemuck::bytes_of(self)));
    }
}

/// Compute pipelines are fully identified by the dedup hash of their single permutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ComputePipelineKey(pub u64);
