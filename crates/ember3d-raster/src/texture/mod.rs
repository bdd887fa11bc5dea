//! Texture memory and sampling.
//!
//! Everything here is pure CPU code shared by the software backend and by
//! tests; the GPU backend uploads [`TextureMemory`] as-is and runs the
//! equivalent WGSL.

mod decode;
mod memory;
mod param;
mod sample;

pub use decode::{fetch, wrap_coord};
pub use memory::{
    TextureMemory, VramSnapshot, MEMORY_WIDTH, PALETTE_CHUNK_SIZE, PALETTE_ROWS, TEXEL_ROWS, TEXTURE_BANK_SIZE,
};
pub use param::{bits, pack, TexFormat, TextureParams, WrapMode};
pub use sample::{sample, sample_bilinear, sample_nearest, TextureFiltering};
