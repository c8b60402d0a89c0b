//! Translation of GCN surface formats into host attachment formats.

use std::fmt;

use bytemuck::{Pod, Zeroable};

use crate::regs::{StencilFormat, SwapMode, ZFormat};

/// Host attachment format.
///
/// This is a transparent `u32` (numbered like `VkFormat`) rather than an enum so that it can
/// live inside the plain-old-data pipeline keys.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Format(pub u32);

impl Format {
    pub const UNDEFINED: Self = Self(0);
    pub const R4G4B4A4_UNORM_PACK16: Self = Self(2);
    pub const B5G6R5_UNORM_PACK16: Self = Self(5);
    pub const R5G5B5A1_UNORM_PACK16: Self = Self(6);
    pub const A1R5G5B5_UNORM_PACK16: Self = Self(8);
    pub const R8_UNORM: Self = Self(9);
    pub const R8_SNORM: Self = Self(10);
    pub const R8_UINT: Self = Self(13);
    pub const R8_SINT: Self = Self(14);
    pub const R8G8_UNORM: Self = Self(16);
    pub const R8G8_SNORM: Self = Self(17);
    pub const R8G8_UINT: Self = Self(20);
    pub const R8G8_SINT: Self = Self(21);
    pub const R8G8B8A8_UNORM: Self = Self(37);
    pub const R8G8B8A8_SNORM: Self = Self(38);
    pub const R8G8B8A8_UINT: Self = Self(41);
    pub const R8G8B8A8_SINT: Self = Self(42);
    pub const R8G8B8A8_SRGB: Self = Self(43);
    pub const B8G8R8A8_UNORM: Self = Self(44);
    pub const B8G8R8A8_SNORM: Self = Self(45);
    pub const B8G8R8A8_UINT: Self = Self(48);
    pub const B8G8R8A8_SINT: Self = Self(49);
    pub const B8G8R8A8_SRGB: Self = Self(50);
    pub const A2B10G10R10_UNORM_PACK32: Self = Self(64);
    pub const A2B10G10R10_UINT_PACK32: Self = Self(68);
    pub const R16_UNORM: Self = Self(70);
    pub const R16_SNORM: Self = Self(71);
    pub const R16_UINT: Self = Self(74);
    pub const R16_SINT: Self = Self(75);
    pub const R16_SFLOAT: Self = Self(76);
    pub const R16G16_UNORM: Self = Self(77);
    pub const R16G16_SNORM: Self = Self(78);
    pub const R16G16_UINT: Self = Self(81);
    pub const R16G16_SINT: Self = Self(82);
    pub const R16G16_SFLOAT: Self = Self(83);
    pub const R16G16B16A16_UNORM: Self = Self(91);
    pub const R16G16B16A16_SNORM: Self = Self(92);
    pub const R16G16B16A16_UINT: Self = Self(95);
    pub const R16G16B16A16_SINT: Self = Self(96);
    pub const R16G16B16A16_SFLOAT: Self = Self(97);
    pub const R32_UINT: Self = Self(98);
    pub const R32_SINT: Self = Self(99);
    pub const R32_SFLOAT: Self = Self(100);
    pub const R32G32_UINT: Self = Self(101);
    pub const R32G32_SINT: Self = Self(102);
    pub const R32G32_SFLOAT: Self = Self(103);
    pub const R32G32B32A32_UINT: Self = Self(107);
    pub const R32G32B32A32_SINT: Self = Self(108);
    pub const R32G32B32A32_SFLOAT: Self = Self(109);
    pub const B10G11R11_UFLOAT_PACK32: Self = Self(122);
    pub const D16_UNORM: Self = Self(124);
    pub const D32_SFLOAT: Self = Self(126);
    pub const D16_UNORM_S8_UINT: Self = Self(128);
    pub const D32_SFLOAT_S8_UINT: Self = Self(130);

    pub const fn is_undefined(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format({})", self.0)
    }
}

/// `CB_COLORn_INFO.FORMAT`.
pub mod data_format {
    pub const INVALID: u32 = 0;
    pub const COLOR_8: u32 = 1;
    pub const COLOR_16: u32 = 2;
    pub const COLOR_8_8: u32 = 3;
    pub const COLOR_32: u32 = 4;
    pub const COLOR_16_16: u32 = 5;
    pub const COLOR_10_11_11: u32 = 6;
    pub const COLOR_2_10_10_10: u32 = 9;
    pub const COLOR_8_8_8_8: u32 = 10;
    pub const COLOR_32_32: u32 = 11;
    pub const COLOR_16_16_16_16: u32 = 12;
    pub const COLOR_32_32_32_32: u32 = 14;
    pub const COLOR_5_6_5: u32 = 16;
    pub const COLOR_1_5_5_5: u32 = 17;
    pub const COLOR_5_5_5_1: u32 = 18;
    pub const COLOR_4_4_4_4: u32 = 19;
}

/// `CB_COLORn_INFO.NUMBER_TYPE`.
pub mod number_format {
    pub const UNORM: u32 = 0;
    pub const SNORM: u32 = 1;
    pub const UINT: u32 = 4;
    pub const SINT: u32 = 5;
    pub const SRGB: u32 = 6;
    pub const FLOAT: u32 = 7;
}

/// Map a color buffer data/number format pair to a host format.
///
/// Returns `None` for combinations the host cannot render to.
pub fn surface_format(data: u32, number: u32) -> Option<Format> {
    use data_format as df;
    use number_format as nf;

    let format = match (data, number) {
        (df::COLOR_8, nf::UNORM) => Format::R8_UNORM,
        (df::COLOR_8, nf::SNORM) => Format::R8_SNORM,
        (df::COLOR_8, nf::UINT) => Format::R8_UINT,
        (df::COLOR_8, nf::SINT) => Format::R8_SINT,
        (df::COLOR_16, nf::UNORM) => Format::R16_UNORM,
        (df::COLOR_16, nf::SNORM) => Format::R16_SNORM,
        (df::COLOR_16, nf::UINT) => Format::R16_UINT,
        (df::COLOR_16, nf::SINT) => Format::R16_SINT,
        (df::COLOR_16, nf::FLOAT) => Format::R16_SFLOAT,
        (df::COLOR_8_8, nf::UNORM) => Format::R8G8_UNORM,
        (df::COLOR_8_8, nf::SNORM) => Format::R8G8_SNORM,
        (df::COLOR_8_8, nf::UINT) => Format::R8G8_UINT,
        (df::COLOR_8_8, nf::SINT) => Format::R8G8_SINT,
        (df::COLOR_32, nf::UINT) => Format::R32_UINT,
        (df::COLOR_32, nf::SINT) => Format::R32_SINT,
        (df::COLOR_32, nf::FLOAT) => Format::R32_SFLOAT,
        (df::COLOR_16_16, nf::UNORM) => Format::R16G16_UNORM,
        (df::COLOR_16_16, nf::SNORM) => Format::R16G16_SNORM,
        (df::COLOR_16_16, nf::UINT) => Format::R16G16_UINT,
        (df::COLOR_16_16, nf::SINT) => Format::R16G16_SINT,
        (df::COLOR_16_16, nf::FLOAT) => Format::R16G16_SFLOAT,
        (df::COLOR_10_11_11, nf::FLOAT) => Format::B10G11R11_UFLOAT_PACK32,
        (df::COLOR_2_10_10_10, nf::UNORM) => Format::A2B10G10R10_UNORM_PACK32,
        (df::COLOR_2_10_10_10, nf::UINT) => Format::A2B10G10R10_UINT_PACK32,
        (df::COLOR_8_8_8_8, nf::UNORM) => Format::R8G8B8A8_UNORM,
        (df::COLOR_8_8_8_8, nf::SNORM) => Format::R8G8B8A8_SNORM,
        (df::COLOR_8_8_8_8, nf::UINT) => Format::R8G8B8A8_UINT,
        (df::COLOR_8_8_8_8, nf::SINT) => Format::R8G8B8A8_SINT,
        (df::COLOR_8_8_8_8, nf::SRGB) => Format::R8G8B8A8_SRGB,
        (df::COLOR_32_32, nf::UINT) => Format::R32G32_UINT,
        (df::COLOR_32_32, nf::SINT) => Format::R32G32_SINT,
        (df::COLOR_32_32, nf::FLOAT) => Format::R32G32_SFLOAT,
        (df::COLOR_16_16_16_16, nf::UNORM) => Format::R16G16B16A16_UNORM,
        (df::COLOR_16_16_16_16, nf::SNORM) => Format::R16G16B16A16_SNORM,
        (df::COLOR_16_16_16_16, nf::UINT) => Format::R16G16B16A16_UINT,
        (df::COLOR_16_16_16_16, nf::SINT) => Format::R16G16B16A16_SINT,
        (df::COLOR_16_16_16_16, nf::FLOAT) => Format::R16G16B16A16_SFLOAT,
        (df::COLOR_32_32_32_32, nf::UINT) => Format::R32G32B32A32_UINT,
        (df::COLOR_32_32_32_32, nf::SINT) => Format::R32G32B32A32_SINT,
        (df::COLOR_32_32_32_32, nf::FLOAT) => Format::R32G32B32A32_SFLOAT,
        (df::COLOR_5_6_5, nf::UNORM) => Format::B5G6R5_UNORM_PACK16,
        (df::COLOR_1_5_5_5, nf::UNORM) => Format::A1R5G5B5_UNORM_PACK16,
        (df::COLOR_5_5_5_1, nf::UNORM) => Format::R5G5B5A1_UNORM_PACK16,
        (df::COLOR_4_4_4_4, nf::UNORM) => Format::R4G4B4A4_UNORM_PACK16,
        _ => return None,
    };
    Some(format)
}

/// Fold a component swap into the attachment format where the host has a matching layout.
///
/// Only the alternate swap of 8-bit RGBA formats has a host equivalent (BGRA); every other swap
/// is left to the fragment shader via the MRT swizzle table.
pub fn adjust_color_buffer_format(base: Format, comp_swap: SwapMode) -> Format {
    if comp_swap != SwapMode::Alternate {
        return base;
    }
    match base {
        Format::R8G8B8A8_UNORM => Format::B8G8R8A8_UNORM,
        Format::R8G8B8A8_SNORM => Format::B8G8R8A8_SNORM,
        Format::R8G8B8A8_UINT => Format::B8G8R8A8_UINT,
        Format::R8G8B8A8_SINT => Format::B8G8R8A8_SINT,
        Format::R8G8B8A8_SRGB => Format::B8G8R8A8_SRGB,
        Format::B8G8R8A8_UNORM => Format::R8G8B8A8_UNORM,
        Format::B8G8R8A8_SNORM => Format::R8G8B8A8_SNORM,
        Format::B8G8R8A8_UINT => Format::R8G8B8A8_UINT,
        Format::B8G8R8A8_SINT => Format::R8G8B8A8_SINT,
        Format::B8G8R8A8_SRGB => Format::R8G8B8A8_SRGB,
        other => other,
    }
}

/// Combined depth/stencil attachment format for a depth buffer.
pub fn depth_format(z: ZFormat, stencil: StencilFormat) -> Format {
    let has_stencil = stencil != StencilFormat::Invalid;
    match (z, has_stencil) {
        (ZFormat::Z16, false) => Format::D16_UNORM,
        (ZFormat::Z16, true) => Format::D16_UNORM_S8_UINT,
        (ZFormat::Z32Float, false) => Format::D32_SFLOAT,
        (ZFormat::Z32Float, true) => Format::D32_SFLOAT_S8_UINT,
        // Stencil without depth has no host attachment.
        (ZFormat::Invalid, _) => Format::UNDEFINED,
    }
}
