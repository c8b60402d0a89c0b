//! Draw and shader vetoes applied before any compilation work.

use std::fmt;

use hashbrown::HashSet;

use crate::regs::{ColorControlMode, PrimitiveType, Regs, Stage};

/// Why a draw was dropped without building a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawSkipReason {
    /// Patch topology needs tessellation, which is not supported.
    PatchPrimitive,
    NoPrimitive,
    /// The color block only eliminates fast clears; nothing is rasterized.
    EliminateFastClear,
    FmaskDecompress,
    /// A tessellation control program is bound.
    Tessellation,
}

impl fmt::Display for DrawSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DrawSkipReason::PatchPrimitive => "patch primitive topology",
            DrawSkipReason::NoPrimitive => "no primitive topology",
            DrawSkipReason::EliminateFastClear => "fast clear elimination pass",
            DrawSkipReason::FmaskDecompress => "fmask decompression pass",
            DrawSkipReason::Tessellation => "tessellation",
        };
        f.write_str(s)
    }
}

/// Topology and color mode checks; `None` means the draw may proceed.
pub fn draw_skip_reason(regs: &Regs) -> Option<DrawSkipReason> {
    match regs.primitive_type {
        PrimitiveType::PatchPrimitive => return Some(DrawSkipReason::PatchPrimitive),
        PrimitiveType::None => return Some(DrawSkipReason::NoPrimitive),
        _ => {}
    }
    match regs.color_control.mode() {
        ColorControlMode::EliminateFastClear => Some(DrawSkipReason::EliminateFastClear),
        ColorControlMode::FmaskDecompress => Some(DrawSkipReason::FmaskDecompress),
        _ => None,
    }
}

/// Whether the hull stage is enabled with a program bound to it.
pub fn tessellation_requested(regs: &Regs) -> bool {
    regs.stage_enable.is_stage_enabled(Stage::Hull) && regs.hs_program.is_bound()
}

/// Shader content hashes that must never be compiled.
#[derive(Clone, Debug, Default)]
pub struct ShaderDenylist {
    hashes: HashSet<u64>,
}

impl ShaderDenylist {
    pub fn new(hashes: impl IntoIterator<Item = u64>) -> Self {
        Self {
            hashes: hashes.into_iter().collect(),
        }
    }

    pub fn should_skip_shader(&self, hash: u64) -> bool {
        self.hashes.contains(&hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawable_regs() -> Regs {
        let mut regs = Regs::default();
        regs.primitive_type = PrimitiveType::TriangleList;
        regs.color_control.set_mode_raw(1);
        regs
    }

    #[test]
    fn ordinary_draw_is_not_skipped() {
        assert_eq!(draw_skip_reason(&drawable_regs()), None);
    }

    #[test]
    fn topology_and_no_op_passes_are_skipped() {
        let mut regs = drawable_regs();
        regs.primitive_type = PrimitiveType::PatchPrimitive;
        assert_eq!(draw_skip_reason(&regs), Some(DrawSkipReason::PatchPrimitive));

        regs.primitive_type = PrimitiveType::None;
        assert_eq!(draw_skip_reason(&regs), Some(DrawSkipReason::NoPrimitive));

        let mut regs = drawable_regs();
        regs.color_control.set_mode_raw(2);
        assert_eq!(draw_skip_reason(&regs), Some(DrawSkipReason::EliminateFastClear));
        regs.color_control.set_mode_raw(5);
        assert_eq!(draw_skip_reason(&regs), Some(DrawSkipReason::FmaskDecompress));
        regs.color_control.set_mode_raw(3);
        assert_eq!(draw_skip_reason(&regs), None);
    }

    #[test]
    fn tessellation_needs_enable_and_program() {
        let mut regs = drawable_regs();
        regs.hs_program.address = 0x1000;
        assert!(!tessellation_requested(&regs));

        regs.stage_enable.set_hs_en(1);
        assert!(tessellation_requested(&regs));

        regs.hs_program.address = 0;
        assert!(!tessellation_requested(&regs));
    }

    #[test]
    fn denylist_matches_only_listed_hashes() {
        let denylist = ShaderDenylist::default();
        assert!(!denylist.should_skip_shader(0));

        let denylist = ShaderDenylist::new([0xabc]);
        assert!(denylist.should_skip_shader(0xabc));
        assert!(!denylist.should_skip_shader(0xabd));
    }
}
