/// Iterates through a packed ARGB image in 4x4 tiles, row-major, yielding the
/// 16 pixels of each tile.
///
/// Images whose width or height are not multiples of 4 are handled by
/// remapping out-of-range tile coordinates modulo the remaining valid extent,
/// so edge pixels replicate and the source buffer is never read out of
/// bounds.
pub(crate) struct BlockIterator<'a> {
    pixels: &'a [u32],
    width: u32,
    height: u32,

    x_block: u32,
    y_block: u32,
}

impl<'a> BlockIterator<'a> {
    pub fn new(pixels: &'a [u32], width: u32, height: u32) -> Self {
        debug_assert!(pixels.len() >= (width as usize) * (height as usize));

        Self {
            pixels,
            width,
            height,

            x_block: 0,
            y_block: 0,
        }
    }
}

impl Iterator for BlockIterator<'_> {
    type Item = [u32; 16];

    fn next(&mut self) -> Option<Self::Item> {
        if self.width == 0 || self.y_block >= self.height {
            return None;
        }

        // remaining valid extent of this tile
        let xr = (self.width - self.x_block).min(4);
        let yr = (self.height - self.y_block).min(4);

        let mut block = [0u32; 16];
        for y in 0..4u32 {
            let sy = self.y_block + y % yr;
            for x in 0..4u32 {
                let sx = self.x_block + x % xr;
                block[(y * 4 + x) as usize] =
                    self.pixels[sy as usize * self.width as usize + sx as usize];
            }
        }

        self.x_block += 4;
        if self.x_block >= self.width {
            self.x_block = 0;
            self.y_block += 4;
        }

        Some(block)
    }
}
