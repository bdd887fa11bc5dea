//! Linear output buffer and scanline access.

/// Native frame size.
pub const SCREEN_WIDTH: u32 = 256;
pub const SCREEN_HEIGHT: u32 = 192;

/// Lines per band in chunked mode.
pub const BAND_HEIGHT: u32 = 48;
pub const BAND_COUNT: usize = (SCREEN_HEIGHT / BAND_HEIGHT) as usize;

/// A horizontal slice of the frame, in native lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Band {
    pub y: u32,
    pub height: u32,
}

impl Band {
    pub const FULL: Band = Band { y: 0, height: SCREEN_HEIGHT };

    /// The `i`-th chunked-mode band.
    #[inline]
    pub const fn chunk(i: usize) -> Self {
        Self { y: i as u32 * BAND_HEIGHT, height: BAND_HEIGHT }
    }

    #[inline]
    pub const fn contains(&self, line: u32) -> bool {
        line >= self.y && line < self.y + self.height
    }

    /// Target-pixel rows covered at upscale exponent `scale`.
    #[inline]
    pub const fn rows(&self, scale: u32) -> core::ops::Range<u32> {
        (self.y << scale)..((self.y + self.height) << scale)
    }
}

/// Reduces an 8-bit RGBA pixel (R in the low byte) to 6-bit color and 5-bit alpha.
#[inline]
pub const fn reduce_pixel(p: u32) -> u32 {
    ((p & 0x00FC_FCFC) >> 2) | ((p & 0xF800_0000) >> 3)
}

/// Read-back pixels for the whole frame plus per-band completion state.
#[derive(Debug)]
pub struct Framebuffer {
    scale: u32,
    pixels: Vec<u32>,
    ready: [bool; BAND_COUNT],
}

impl Framebuffer {
    pub fn new(scale: u32) -> Self {
        let mut fb = Self { scale, pixels: Vec::new(), ready: [false; BAND_COUNT] };
        fb.resize(scale);
        fb
    }

    pub fn resize(&mut self, scale: u32) {
        self.scale = scale;
        self.pixels = vec![0; (self.width() * (SCREEN_HEIGHT << scale)) as usize];
        self.ready = [false; BAND_COUNT];
    }

    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Row stride in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        SCREEN_WIDTH << self.scale
    }

    pub fn invalidate(&mut self) {
        self.ready = [false; BAND_COUNT];
    }

    /// Storage for a band's rows, to be filled by the backend.
    pub fn band_mut(&mut self, band: Band) -> &mut [u32] {
        let rows = band.rows(self.scale);
        let w = self.width() as usize;
        &mut self.pixels[rows.start as usize * w..rows.end as usize * w]
    }

    /// Marks every chunk overlapped by `band` as read back.
    pub fn mark_ready(&mut self, band: Band) {
        for (i, r) in self.ready.iter_mut().enumerate() {
            let chunk = Band::chunk(i);
            if chunk.y >= band.y && chunk.y + chunk.height <= band.y + band.height {
                *r = true;
            }
        }
    }

    /// Whether native line `line` has been read back this frame.
    #[inline]
    pub fn is_ready(&self, line: u32) -> bool {
        self.ready.get((line / BAND_HEIGHT) as usize).copied().unwrap_or(false)
    }

    /// All target rows of native line `line`: `width << scale` pixels.
    pub fn line(&self, line: u32) -> &[u32] {
        let w = self.width() as usize;
        let rows_per_line = 1usize << self.scale;
        let start = line as usize * rows_per_line * w;
        &self.pixels[start..start + rows_per_line * w]
    }

    /// Applies [`reduce_pixel`] to a band in place.
    pub fn reduce_band(&mut self, band: Band) {
        for p in self.band_mut(band) {
            *p = reduce_pixel(*p);
        }
    }
}
