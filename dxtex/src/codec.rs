pub trait BlockCodecBase {
    fn get_block_size(&self) -> (u32, u32);
    fn get_block_bytes(&self) -> usize;
}

pub trait BlockEncoderBase: BlockCodecBase {
    /// Size in bytes of the compressed output for an image of the given
    /// dimensions: one block per started tile, edge tiles included.
    fn output_len(&self, width: u32, height: u32) -> usize {
        let (x_block_size, y_block_size) = self.get_block_size();

        let x_blocks = width.div_ceil(x_block_size) as usize;
        let y_blocks = height.div_ceil(y_block_size) as usize;

        x_blocks * y_blocks * self.get_block_bytes()
    }
}

pub trait BlockEncoder: BlockEncoderBase {
    /// Compresses a packed ARGB buffer of the given dimensions into a tightly
    /// packed block stream, tiles in row-major order.
    fn encode(&self, pixels: &[u32], width: u32, height: u32) -> Vec<u8>;
}
