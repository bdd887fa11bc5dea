//! Texel fetch for the seven native formats.
//!
//! `raster.wgsl` carries the same logic for the GPU backend; both must agree
//! bit for bit on which texels are transparent.

use crate::color::Color;

use super::memory::TextureMemory;
use super::param::{TexFormat, TextureParams, WrapMode};

/// Maps a texel coordinate into `[0, size)`. `size` is a power of two.
#[inline]
pub fn wrap_coord(c: i32, size: i32, mode: WrapMode) -> i32 {
    match mode {
        WrapMode::Clamp => c.clamp(0, size - 1),
        WrapMode::Repeat => c & (size - 1),
        WrapMode::Mirror if c & size != 0 => (size - 1) - (c & (size - 1)),
        WrapMode::Mirror => c & (size - 1),
    }
}

/// Decodes the texel at integer coordinate `(s, t)`.
///
/// Returns transparent black for [`TexFormat::None`].
pub fn fetch(mem: &TextureMemory, tex: &TextureParams, s: i32, t: i32) -> Color {
    let w = tex.width as i32;
    let s = wrap_coord(s, w, tex.wrap_s) as u32;
    let t = wrap_coord(t, tex.height as i32, tex.wrap_t) as u32;
    let texel = t * tex.width + s;
    let pal = tex.palette;

    match tex.format {
        TexFormat::None => Color::TRANSPARENT,
        TexFormat::A3I5 => {
            let p = mem.texel(tex.address + texel);
            let a3 = p >> 5;
            let alpha = (a3 << 2) + (a3 >> 1);
            palette_color(mem, (pal << 3) + u32::from(p & 0x1F), f32::from(alpha) / 31.0)
        }
        TexFormat::I2 => {
            let p = mem.texel(tex.address + (texel >> 2));
            let idx = (p >> (2 * (s & 3))) & 0x3;
            indexed(mem, tex, (pal << 2) + u32::from(idx), idx)
        }
        TexFormat::I4 => {
            let p = mem.texel(tex.address + (texel >> 1));
            let idx = if s & 1 != 0 { p >> 4 } else { p & 0xF };
            indexed(mem, tex, (pal << 3) + u32::from(idx), idx)
        }
        TexFormat::I8 => {
            let idx = mem.texel(tex.address + texel);
            indexed(mem, tex, (pal << 3) + u32::from(idx), idx)
        }
        TexFormat::Compressed => compressed(mem, tex, s, t),
        TexFormat::A5I3 => {
            let p = mem.texel(tex.address + texel);
            palette_color(mem, (pal << 3) + u32::from(p & 0x7), f32::from(p >> 3) / 31.0)
        }
        TexFormat::Direct => {
            let c = mem.texel_u16(tex.address + (texel << 1));
            Color::from_rgb555(c, f32::from(c >> 15))
        }
    }
}

#[inline]
fn palette_color(mem: &TextureMemory, index: u32, alpha: f32) -> Color {
    Color::from_rgb555(mem.palette_entry(index), alpha)
}

#[inline]
fn indexed(mem: &TextureMemory, tex: &TextureParams, index: u32, raw: u8) -> Color {
    let alpha = if raw == 0 && tex.color0_transparent { 0.0 } else { 1.0 };
    palette_color(mem, index, alpha)
}

/// 4×4 block compression: 2 bits per texel plus a per-block side-table word.
fn compressed(mem: &TextureMemory, tex: &TextureParams, s: u32, t: u32) -> Color {
    // Blocks are stored as four row bytes, row-major over the block grid.
    let addr = tex.address + (t & 0x3FC) * (tex.width >> 2) + (s & 0x3FC) + (t & 0x3);
    let val = (mem.texel(addr) >> (2 * (s & 0x3))) & 0x3;

    let mut slot1 = 0x2_0000 + ((addr & 0x1_FFFC) >> 1);
    if addr >= 0x4_0000 {
        slot1 += 0x1_0000;
    }
    let info = u32::from(mem.texel_u16(slot1));

    let base = (tex.palette << 3) + ((info & 0x3FFF) << 1);
    let mode = info >> 14;
    let color = |i: u32| palette_color(mem, base + i, 1.0);

    match (val, mode) {
        (0, _) => color(0),
        (1, _) => color(1),
        (2, 1) => blend(color(0), 1.0, color(1), 1.0, 2.0),
        (2, 3) => blend(color(0), 5.0, color(1), 3.0, 8.0),
        (2, _) => color(2),
        (_, 2) => color(3),
        (_, 3) => blend(color(0), 3.0, color(1), 5.0, 8.0),
        _ => Color::TRANSPARENT,
    }
}

#[inline]
fn blend(a: Color, wa: f32, b: Color, wb: f32, div: f32) -> Color {
    Color::new(
        (a.r * wa + b.r * wb) / div,
        (a.g * wa + b.g * wb) / div,
        (a.b * wa + b.b * wb) / div,
        1.0,
    )
}
