/// Width of both memory images, in texels.
pub const MEMORY_WIDTH: u32 = 1024;
/// Rows in the texel image (4 banks × 128 KiB).
pub const TEXEL_ROWS: u32 = 512;
/// Rows in the palette image (6 chunks × 16 KiB, as halfwords).
pub const PALETTE_ROWS: u32 = 48;

pub const TEXTURE_BANK_SIZE: usize = 128 * 1024;
pub const PALETTE_CHUNK_SIZE: usize = 16 * 1024;

const TEXEL_LEN: usize = (MEMORY_WIDTH * TEXEL_ROWS) as usize;
const PALETTE_LEN: usize = (MEMORY_WIDTH * PALETTE_ROWS) as usize;

/// Borrowed view of the VRAM blocks mapped for 3D use this frame.
///
/// Unmapped banks or chunks read as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct VramSnapshot<'a> {
    pub texture_banks: [Option<&'a [u8]>; 4],
    pub palette_chunks: [Option<&'a [u8]>; 6],
}

/// Flat copy of texture and palette memory, laid out as the backend sees it.
///
/// Texels are one byte each; palette entries are raw 5-5-5 halfwords.
#[derive(Debug, Clone)]
pub struct TextureMemory {
    texels: Vec<u8>,
    palette: Vec<u16>,
}

impl Default for TextureMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureMemory {
    pub fn new() -> Self {
        Self { texels: vec![0; TEXEL_LEN], palette: vec![0; PALETTE_LEN] }
    }

    /// Replaces the whole contents from a VRAM snapshot.
    pub fn load(&mut self, vram: &VramSnapshot<'_>) {
        for (bank, dst) in vram.texture_banks.iter().zip(self.texels.chunks_exact_mut(TEXTURE_BANK_SIZE)) {
            copy_or_zero(dst, *bank);
        }

        let halfwords = PALETTE_CHUNK_SIZE / 2;
        for (chunk, dst) in vram.palette_chunks.iter().zip(self.palette.chunks_exact_mut(halfwords)) {
            match chunk {
                Some(src) => {
                    let n = (src.len() / 2).min(halfwords);
                    for (d, s) in dst[..n].iter_mut().zip(src.chunks_exact(2)) {
                        *d = u16::from_le_bytes([s[0], s[1]]);
                    }
                    dst[n..].fill(0);
                }
                None => dst.fill(0),
            }
        }
    }

    /// Byte at a texture memory address. Addresses wrap at 512 KiB.
    #[inline]
    pub fn texel(&self, addr: u32) -> u8 {
        self.texels[addr as usize % TEXEL_LEN]
    }

    /// Little-endian halfword at a texture memory address.
    #[inline]
    pub fn texel_u16(&self, addr: u32) -> u16 {
        u16::from(self.texel(addr)) | (u16::from(self.texel(addr.wrapping_add(1))) << 8)
    }

    /// Palette entry by halfword index. Out-of-range entries read as zero.
    #[inline]
    pub fn palette_entry(&self, index: u32) -> u16 {
        self.palette.get(index as usize).copied().unwrap_or(0)
    }

    #[inline]
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    #[inline]
    pub fn palette(&self) -> &[u16] {
        &self.palette
    }

    /// Mutable texel bytes, for building test fixtures in place.
    #[inline]
    pub fn texels_mut(&mut self) -> &mut [u8] {
        &mut self.texels
    }

    #[inline]
    pub fn palette_mut(&mut self) -> &mut [u16] {
        &mut self.palette
    }
}

fn copy_or_zero(dst: &mut [u8], src: Option<&[u8]>) {
    match src {
        Some(src) => {
            let n = src.len().min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
            dst[n..].fill(0);
        }
        None => dst.fill(0),
    }
}
