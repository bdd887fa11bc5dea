/// A transformed, lit vertex as produced by the geometry engine.
///
/// Vertices are shared between polygons of a mesh and never mutated here.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Vertex {
    /// Screen position at native resolution (whole pixels, +Y down).
    pub position: [i32; 2],
    /// Screen position with 4 sub-pixel bits, used when rendering upscaled.
    pub hires_position: [i32; 2],
    /// Final color as three 9-bit intensities (`0..=511`).
    pub color: [u16; 3],
    /// Texture coordinates in 12.4 fixed point.
    pub texcoord: [i16; 2],
}

impl Vertex {
    /// White vertex at a whole-pixel position.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            position: [x, y],
            hires_position: [x << 4, y << 4],
            color: [511; 3],
            texcoord: [0; 2],
        }
    }

    /// Sets the color from 5-bit channels, expanded the way the lighting unit does.
    pub fn rgb5(mut self, r: u8, g: u8, b: u8) -> Self {
        self.color = [expand_rgb5(r), expand_rgb5(g), expand_rgb5(b)];
        self
    }

    /// Sets texture coordinates given in whole texels.
    pub fn texel(mut self, s: i16, t: i16) -> Self {
        self.texcoord = [s << 4, t << 4];
        self
    }
}

/// 5-bit channel to 9-bit intensity; zero stays zero.
#[inline]
pub fn expand_rgb5(c: u8) -> u16 {
    let c = u16::from(c & 0x1F);
    if c == 0 { 0 } else { (c << 4) + 0xF }
}
