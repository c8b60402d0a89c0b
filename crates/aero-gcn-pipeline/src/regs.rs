//! Read-only view of the GCN command processor register file.
//!
//! Only the registers that participate in pipeline identity are modelled. Bit-packed registers
//! are kept as raw `u32` words (exactly as the guest wrote them) and decoded through accessor
//! methods that use the hardware bit positions, so a snapshot can be compared or hashed without
//! any lossy translation step.

use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Number of hardware color buffer slots (`CB_COLOR0..CB_COLOR7`).
pub const NUM_COLOR_BUFFERS: usize = 8;

/// Number of `SPI_PS_INPUT_CNTL_n` interpolant slots.
pub const NUM_PS_INPUTS: usize = 32;

/// Number of user data SGPRs exposed per shader stage.
pub const NUM_USER_DATA: usize = 16;

/// Number of graphics shader stages (everything except compute).
pub const MAX_GRAPHICS_STAGES: usize = 6;

/// Signature stored at the start of the binary info trailer emitted by the guest shader compiler.
pub const BINARY_INFO_SIGNATURE: [u8; 7] = *b"OrbShdr";

/// Declares a `u32` register newtype with getter/setter pairs for its bit fields.
macro_rules! register {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident, $setter:ident: $shift:literal, $width:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
        pub struct $name(pub u32);

        #[allow(dead_code)]
        impl $name {
            $(
                $(#[$fmeta])*
                #[inline]
                pub const fn $field(self) -> u32 {
                    (self.0 >> $shift) & ((1u32 << $width) - 1)
                }

                #[inline]
                pub fn $setter(&mut self, value: u32) {
                    let mask = ((1u32 << $width) - 1) << $shift;
                    self.0 = (self.0 & !mask) | ((value << $shift) & mask);
                }
            )*
        }
    };
}

/// Hardware shader stages, in the order the command processor indexes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Fragment,
    Vertex,
    Geometry,
    Export,
    /// Tessellation control (hull) stage.
    Hull,
    Local,
    Compute,
}

impl Stage {
    /// Graphics stages in binding-allocation order.
    pub const GRAPHICS: [Stage; MAX_GRAPHICS_STAGES] = [
        Stage::Fragment,
        Stage::Vertex,
        Stage::Geometry,
        Stage::Export,
        Stage::Hull,
        Stage::Local,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Fragment => "fs",
            Stage::Vertex => "vs",
            Stage::Geometry => "gs",
            Stage::Export => "es",
            Stage::Hull => "hs",
            Stage::Local => "ls",
            Stage::Compute => "cs",
        };
        f.write_str(s)
    }
}

register! {
    /// `VGT_SHADER_STAGES_EN`.
    pub struct StageEnable {
        ls_en, set_ls_en: 0, 2;
        hs_en, set_hs_en: 2, 1;
        es_en, set_es_en: 3, 2;
        gs_en, set_gs_en: 5, 1;
        vs_en, set_vs_en: 6, 2;
    }
}

impl StageEnable {
    /// Fragment and vertex stages are always live; the remaining stages are gated by the
    /// `VGT_SHADER_STAGES_EN` fields.
    pub const fn is_stage_enabled(self, stage: Stage) -> bool {
        match stage {
            Stage::Fragment | Stage::Vertex | Stage::Compute => true,
            Stage::Geometry => self.gs_en() != 0,
            Stage::Export => self.es_en() != 0,
            Stage::Hull => self.hs_en() != 0,
            Stage::Local => self.ls_en() != 0,
        }
    }
}

register! {
    /// `SPI_SHADER_PGM_RSRC1_*`.
    pub struct ProgramRsrc1 {
        num_vgprs, set_num_vgprs: 0, 6;
        num_sgprs, set_num_sgprs: 6, 4;
        vgpr_comp_cnt, set_vgpr_comp_cnt: 24, 2;
    }
}

register! {
    /// `SPI_SHADER_PGM_RSRC2_*` / `COMPUTE_PGM_RSRC2`.
    pub struct ProgramRsrc2 {
        scratch_en, set_scratch_en: 0, 1;
        num_user_regs, set_num_user_regs: 1, 5;
        tgid_x_en, set_tgid_x_en: 7, 1;
        tgid_y_en, set_tgid_y_en: 8, 1;
        tgid_z_en, set_tgid_z_en: 9, 1;
        /// LDS allocation in 128-dword granules (compute only).
        lds_size, set_lds_size: 15, 9;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProgramSettings {
    pub rsrc1: ProgramRsrc1,
    pub rsrc2: ProgramRsrc2,
}

impl ProgramSettings {
    pub const fn num_user_regs(&self) -> u32 {
        self.rsrc2.num_user_regs()
    }

    pub const fn num_vgprs(&self) -> u32 {
        self.rsrc1.num_vgprs()
    }

    pub const fn vgpr_comp_cnt(&self) -> u32 {
        self.rsrc1.vgpr_comp_cnt()
    }
}

/// Trailer appended to every guest shader binary by the platform shader compiler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BinaryInfo {
    pub signature: [u8; 7],
    pub version: u8,
    /// Content hash of the shader bytecode.
    pub shader_hash: u64,
    /// Length of the bytecode in bytes.
    pub length: u32,
}

impl BinaryInfo {
    pub fn new(shader_hash: u64, length: u32) -> Self {
        Self {
            signature: BINARY_INFO_SIGNATURE,
            version: 1,
            shader_hash,
            length,
        }
    }

    pub fn valid(&self) -> bool {
        self.signature == BINARY_INFO_SIGNATURE
    }
}

/// Inputs handed to shader translation for one program.
#[derive(Clone, Copy, Debug)]
pub struct ShaderParams<'a> {
    pub hash: u64,
    pub code: &'a [u32],
    pub user_data: &'a [u32],
}

/// One bound shader program (`SPI_SHADER_PGM_*` block plus the guest code it points at).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderProgram {
    /// Guest address of the program; `0` means nothing is bound.
    pub address: u64,
    pub settings: ProgramSettings,
    pub user_data: [u32; NUM_USER_DATA],
    pub code: Vec<u32>,
    pub binary_info: BinaryInfo,
}

impl ShaderProgram {
    pub fn is_bound(&self) -> bool {
        self.address != 0
    }

    pub fn params(&self) -> ShaderParams<'_> {
        ShaderParams {
            hash: self.binary_info.shader_hash,
            code: &self.code,
            user_data: &self.user_data,
        }
    }
}

/// Compute program block (`COMPUTE_PGM_*`, `COMPUTE_NUM_THREAD_*`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComputeProgram {
    pub program: ShaderProgram,
    pub num_thread_x: u32,
    pub num_thread_y: u32,
    pub num_thread_z: u32,
}

impl ComputeProgram {
    pub const fn is_tgid_enabled(&self, dim: usize) -> bool {
        let rsrc2 = self.program.settings.rsrc2;
        match dim {
            0 => rsrc2.tgid_x_en() != 0,
            1 => rsrc2.tgid_y_en() != 0,
            2 => rsrc2.tgid_z_en() != 0,
            _ => false,
        }
    }

    /// LDS footprint in bytes.
    pub const fn shared_mem_size(&self) -> u32 {
        self.program.settings.rsrc2.lds_size() * 128 * 4
    }
}

register! {
    /// `DB_DEPTH_CONTROL`.
    pub struct DepthControl {
        stencil_enable, set_stencil_enable: 0, 1;
        depth_enable, set_depth_enable: 1, 1;
        depth_write_enable, set_depth_write_enable: 2, 1;
        depth_bounds_enable, set_depth_bounds_enable: 3, 1;
        depth_func, set_depth_func: 4, 3;
        backface_enable, set_backface_enable: 7, 1;
        stencil_ref_func, set_stencil_ref_func: 8, 3;
        stencil_bf_func, set_stencil_bf_func: 20, 3;
    }
}

register! {
    /// `DB_STENCIL_CONTROL`.
    pub struct StencilControl {
        stencil_fail, set_stencil_fail: 0, 4;
        stencil_zpass, set_stencil_zpass: 4, 4;
        stencil_zfail, set_stencil_zfail: 8, 4;
        stencil_fail_bf, set_stencil_fail_bf: 12, 4;
        stencil_zpass_bf, set_stencil_zpass_bf: 16, 4;
        stencil_zfail_bf, set_stencil_zfail_bf: 20, 4;
    }
}

register! {
    /// `DB_RENDER_CONTROL`.
    pub struct DepthRenderControl {
        depth_clear_enable, set_depth_clear_enable: 0, 1;
        stencil_clear_enable, set_stencil_clear_enable: 1, 1;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ZFormat {
    #[default]
    Invalid,
    Z16,
    Z32Float,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilFormat {
    #[default]
    Invalid,
    Stencil8,
}

/// Decoded `DB_Z_INFO` / `DB_STENCIL_INFO` formats of the bound depth buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DepthBuffer {
    pub z_format: ZFormat,
    pub stencil_format: StencilFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Point,
    Line,
    Fill,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
    FrontAndBack,
}

register! {
    /// `PA_SU_SC_MODE_CNTL`.
    pub struct PolygonControl {
        cull_front, set_cull_front: 0, 1;
        cull_back, set_cull_back: 1, 1;
        /// 0 = counter-clockwise, 1 = clockwise.
        front_face, set_front_face: 2, 1;
        enable_polygon_mode, set_enable_polygon_mode: 3, 2;
        polymode_front_ptype, set_polymode_front_ptype: 5, 3;
        polymode_back_ptype, set_polymode_back_ptype: 8, 3;
        poly_offset_front_enable, set_poly_offset_front_enable: 11, 1;
        poly_offset_back_enable, set_poly_offset_back_enable: 12, 1;
    }
}

impl PolygonControl {
    pub const fn needs_bias(self) -> bool {
        self.poly_offset_front_enable() != 0 || self.poly_offset_back_enable() != 0
    }

    pub const fn poly_mode(self) -> PolygonMode {
        if self.enable_polygon_mode() == 0 {
            return PolygonMode::Fill;
        }
        match self.polymode_front_ptype() {
            0 => PolygonMode::Point,
            1 => PolygonMode::Line,
            _ => PolygonMode::Fill,
        }
    }

    pub const fn culling_mode(self) -> CullMode {
        match (self.cull_front() != 0, self.cull_back() != 0) {
            (false, false) => CullMode::None,
            (true, false) => CullMode::Front,
            (false, true) => CullMode::Back,
            (true, true) => CullMode::FrontAndBack,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipSpace {
    MinusWToW,
    ZeroToW,
}

register! {
    /// `PA_CL_CLIP_CNTL`.
    pub struct ClipperControl {
        dx_clip_space_def, set_dx_clip_space_def: 19, 1;
    }
}

impl ClipperControl {
    pub const fn clip_space(self) -> ClipSpace {
        if self.dx_clip_space_def() != 0 {
            ClipSpace::ZeroToW
        } else {
            ClipSpace::MinusWToW
        }
    }
}

register! {
    /// `PA_SC_AA_CONFIG`.
    pub struct AaConfig {
        msaa_num_samples, set_msaa_num_samples: 0, 3;
    }
}

impl AaConfig {
    pub const fn num_samples(self) -> u32 {
        1 << self.msaa_num_samples()
    }
}

/// `CB_COLOR_CONTROL.MODE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorControlMode {
    Disable,
    Normal,
    EliminateFastClear,
    Resolve,
    FmaskDecompress,
    DccDecompress,
    Reserved(u32),
}

register! {
    /// `CB_COLOR_CONTROL`.
    pub struct ColorControl {
        mode_raw, set_mode_raw: 4, 3;
        rop3, set_rop3: 16, 8;
    }
}

impl ColorControl {
    pub const fn mode(self) -> ColorControlMode {
        match self.mode_raw() {
            0 => ColorControlMode::Disable,
            1 => ColorControlMode::Normal,
            2 => ColorControlMode::EliminateFastClear,
            3 => ColorControlMode::Resolve,
            5 => ColorControlMode::FmaskDecompress,
            6 => ColorControlMode::DccDecompress,
            v => ColorControlMode::Reserved(v),
        }
    }
}

/// `CB_COLORn_INFO.COMP_SWAP`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SwapMode {
    #[default]
    Standard = 0,
    Alternate = 1,
    StandardReverse = 2,
    AlternateReverse = 3,
}

impl SwapMode {
    pub const fn from_raw(v: u32) -> Self {
        match v & 3 {
            0 => Self::Standard,
            1 => Self::Alternate,
            2 => Self::StandardReverse,
            _ => Self::AlternateReverse,
        }
    }
}

register! {
    /// `CB_COLORn_INFO`.
    pub struct ColorBufferInfo {
        endian, set_endian: 0, 2;
        format, set_format: 2, 5;
        number_type, set_number_type: 8, 3;
        comp_swap_raw, set_comp_swap_raw: 11, 2;
        fast_clear, set_fast_clear: 13, 1;
        compression, set_compression: 14, 1;
        blend_clamp, set_blend_clamp: 15, 1;
        blend_bypass, set_blend_bypass: 16, 1;
    }
}

impl ColorBufferInfo {
    pub const fn comp_swap(self) -> SwapMode {
        SwapMode::from_raw(self.comp_swap_raw())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorBuffer {
    pub base_address: u64,
    pub info: ColorBufferInfo,
}

impl ColorBuffer {
    /// A color buffer counts as bound when it has an address and a valid data format.
    pub const fn is_bound(&self) -> bool {
        self.base_address != 0 && self.info.format() != 0
    }
}

/// Per-target 4-bit RGBA masks packed into one word (`CB_TARGET_MASK`, `CB_SHADER_MASK`).
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ColorMask(pub u32);

impl ColorMask {
    pub const fn get_mask(self, target: usize) -> u32 {
        (self.0 >> (target * 4)) & 0xF
    }

    pub fn set_mask(&mut self, target: usize, mask: u32) {
        let shift = target * 4;
        self.0 = (self.0 & !(0xF << shift)) | ((mask & 0xF) << shift);
    }
}

register! {
    /// `CB_BLENDn_CONTROL`.
    pub struct BlendControl {
        color_src_factor, set_color_src_factor: 0, 5;
        color_func, set_color_func: 5, 3;
        color_dst_factor, set_color_dst_factor: 8, 5;
        alpha_src_factor, set_alpha_src_factor: 16, 5;
        alpha_func, set_alpha_func: 21, 3;
        alpha_dst_factor, set_alpha_dst_factor: 24, 5;
        separate_alpha_blend, set_separate_alpha_blend: 29, 1;
        enable, set_enable: 30, 1;
        disable_rop3, set_disable_rop3: 31, 1;
    }
}

/// `VGT_PRIMITIVE_TYPE`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PrimitiveType {
    #[default]
    None = 0x00,
    PointList = 0x01,
    LineList = 0x02,
    LineStrip = 0x03,
    TriangleList = 0x04,
    TriangleFan = 0x05,
    TriangleStrip = 0x06,
    PatchPrimitive = 0x09,
    AdjLineList = 0x0A,
    AdjLineStrip = 0x0B,
    AdjTriangleList = 0x0C,
    AdjTriangleStrip = 0x0D,
    RectList = 0x11,
    LineLoop = 0x12,
    QuadList = 0x13,
    QuadStrip = 0x14,
    Polygon = 0x15,
}

register! {
    /// `PA_CL_VS_OUT_CNTL`.
    pub struct VsOutputControl {
        clip_distance_enable, set_clip_distance_enable: 0, 8;
        cull_distance_enable, set_cull_distance_enable: 8, 8;
        use_vtx_point_size, set_use_vtx_point_size: 16, 1;
        use_vtx_edge_flag, set_use_vtx_edge_flag: 17, 1;
        use_vtx_render_target_idx, set_use_vtx_render_target_idx: 18, 1;
        use_vtx_viewport_idx, set_use_vtx_viewport_idx: 19, 1;
        use_vtx_kill_flag, set_use_vtx_kill_flag: 20, 1;
        use_vtx_gs_cut_flag, set_use_vtx_gs_cut_flag: 25, 1;
    }
}

impl VsOutputControl {
    pub const fn is_clip_dist_enabled(self, index: u32) -> bool {
        (self.clip_distance_enable() >> index) & 1 != 0
    }

    pub const fn is_cull_dist_enabled(self, index: u32) -> bool {
        (self.cull_distance_enable() >> index) & 1 != 0
    }
}

register! {
    /// `SPI_PS_INPUT_CNTL_n`.
    pub struct PsInputControl {
        input_offset, set_input_offset: 0, 5;
        use_default, set_use_default: 5, 1;
        default_value, set_default_value: 8, 2;
        flat_shade, set_flat_shade: 10, 1;
    }
}

/// Snapshot of the command processor registers consumed by pipeline key construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Regs {
    pub stage_enable: StageEnable,
    pub ps_program: ShaderProgram,
    pub vs_program: ShaderProgram,
    pub gs_program: ShaderProgram,
    pub es_program: ShaderProgram,
    pub hs_program: ShaderProgram,
    pub ls_program: ShaderProgram,
    pub cs_program: ComputeProgram,

    pub depth_control: DepthControl,
    pub depth_render_control: DepthRenderControl,
    pub stencil_control: StencilControl,
    pub depth_buffer: DepthBuffer,
    pub polygon_control: PolygonControl,
    pub clipper_control: ClipperControl,
    pub aa_config: AaConfig,

    pub color_control: ColorControl,
    pub color_buffers: [ColorBuffer; NUM_COLOR_BUFFERS],
    pub color_target_mask: ColorMask,
    pub color_shader_mask: ColorMask,
    pub blend_control: [BlendControl; NUM_COLOR_BUFFERS],

    pub primitive_type: PrimitiveType,
    pub enable_primitive_restart: u32,
    pub primitive_restart_index: u32,

    pub vs_output_control: VsOutputControl,
    pub ps_inputs: [PsInputControl; NUM_PS_INPUTS],
    pub num_interp: u32,
}

impl Regs {
    pub fn program_for_stage(&self, stage: Stage) -> Option<&ShaderProgram> {
        match stage {
            Stage::Fragment => Some(&self.ps_program),
            Stage::Vertex => Some(&self.vs_program),
            Stage::Geometry => Some(&self.gs_program),
            Stage::Export => Some(&self.es_program),
            Stage::Hull => Some(&self.hs_program),
            Stage::Local => Some(&self.ls_program),
            Stage::Compute => Some(&self.cs_program.program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_fields_round_trip_through_setters() {
        let mut ctl = DepthControl::default();
        ctl.set_depth_func(5);
        ctl.set_depth_write_enable(1);
        assert_eq!(ctl.depth_func(), 5);
        assert_eq!(ctl.depth_write_enable(), 1);
        assert_eq!(ctl.0, (5 << 4) | (1 << 2));

        // Values wider than the field are truncated instead of bleeding into neighbours.
        ctl.set_depth_func(0xFF);
        assert_eq!(ctl.depth_func(), 7);
        assert_eq!(ctl.backface_enable(), 0);
    }

    #[test]
    fn stage_enable_gates_optional_stages() {
        let mut en = StageEnable::default();
        assert!(en.is_stage_enabled(Stage::Vertex));
        assert!(en.is_stage_enabled(Stage::Fragment));
        assert!(!en.is_stage_enabled(Stage::Hull));

        en.set_hs_en(1);
        en.set_ls_en(2);
        assert!(en.is_stage_enabled(Stage::Hull));
        assert!(en.is_stage_enabled(Stage::Local));
        assert!(!en.is_stage_enabled(Stage::Geometry));
    }

    #[test]
    fn polygon_control_decodes_cull_and_fill() {
        let mut pc = PolygonControl::default();
        assert_eq!(pc.culling_mode(), CullMode::None);
        assert_eq!(pc.poly_mode(), PolygonMode::Fill);
        assert!(!pc.needs_bias());

        pc.set_cull_back(1);
        pc.set_enable_polygon_mode(1);
        pc.set_polymode_front_ptype(1);
        pc.set_poly_offset_back_enable(1);
        assert_eq!(pc.culling_mode(), CullMode::Back);
        assert_eq!(pc.poly_mode(), PolygonMode::Line);
        assert!(pc.needs_bias());
    }

    #[test]
    fn color_mask_is_nibble_per_target() {
        let mut mask = ColorMask::default();
        mask.set_mask(3, 0xF);
        mask.set_mask(0, 0x5);
        assert_eq!(mask.0, 0xF005);
        assert_eq!(mask.get_mask(3), 0xF);
        assert_eq!(mask.get_mask(1), 0);
    }

    #[test]
    fn compute_lds_size_is_in_128_dword_granules() {
        let mut cs = ComputeProgram::default();
        cs.program.settings.rsrc2.set_lds_size(2);
        cs.program.settings.rsrc2.set_tgid_y_en(1);
        assert_eq!(cs.shared_mem_size(), 1024);
        assert!(!cs.is_tgid_enabled(0));
        assert!(cs.is_tgid_enabled(1));
    }

    #[test]
    fn binary_info_validity_follows_signature() {
        assert!(!BinaryInfo::default().valid());
        assert!(BinaryInfo::new(0x1234, 64).valid());
    }
}
