pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
pub const PIXEL_COUNT: usize = WIDTH * HEIGHT;

/// Monochrome 64x32 frame buffer, row-major.
///
/// Coordinates wrap on both axes. `dirty` stays set until the renderer
/// consumes it with [`FrameBuffer::take_dirty`].
pub struct FrameBuffer {
    pixels: [bool; PIXEL_COUNT],
    dirty: bool,
    // bumped on every visible change, lets the engine tell if a step drew
    generation: u64,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [false; PIXEL_COUNT],
            dirty: false,
            generation: 0,
        }
    }

    pub fn clear(&mut self) {
        self.pixels = [false; PIXEL_COUNT];
        self.mark_changed();
    }

    /// XORs `sprite` onto the buffer at (x, y), one byte per row, MSB leftmost.
    ///
    /// Returns true when any lit pixel was switched off.
    pub fn draw(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;
        let mut changed = false;
        for (i, row) in sprite.iter().enumerate() {
            let ny = (y as usize + i) % HEIGHT;
            for j in 0..8 {
                if (row >> (7 - j)) & 1 == 0 {
                    continue;
                }
                let nx = (x as usize + j) % WIDTH;
                let index = ny * WIDTH + nx;
                if self.pixels[index] {
                    collision = true;
                }
                self.pixels[index] ^= true;
                changed = true;
            }
        }
        if changed {
            self.mark_changed();
        }
        collision
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(y % HEIGHT) * WIDTH + (x % WIDTH)]
    }

    pub fn pixels(&self) -> &[bool; PIXEL_COUNT] {
        &self.pixels
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the dirty flag and resets it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    fn mark_changed(&mut self) {
        self.dirty = true;
        self.generation = self.generation.wrapping_add(1);
    }
}
