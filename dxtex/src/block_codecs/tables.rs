use std::sync::OnceLock;

/// Approximates `(a * b) / 255` with the rounding behavior DXT hardware uses
/// when scaling 8-bit channel values into smaller codeword ranges.
pub(crate) fn mul8bit(a: i32, b: i32) -> i32 {
    let t = a * b + 128;
    (t + (t >> 8)) >> 8
}

/// Process-wide lookup tables shared by every block compression call.
///
/// Built exactly once (see [`tables()`]) and immutable afterwards, so
/// concurrent first use from multiple threads is safe.
pub(crate) struct CodecTables {
    /// 5-bit codeword to 8-bit channel value, bit-replication expansion.
    pub expand5: [u8; 32],
    /// 6-bit codeword to 8-bit channel value, bit-replication expansion.
    pub expand6: [u8; 64],
    /// For each 8-bit value, the `[max, min]` 5-bit codeword pair whose
    /// hardware 2/3-1/3 blend best approximates it.
    pub omatch5: [[u8; 2]; 256],
    /// Same as `omatch5` for the 6-bit green channel.
    pub omatch6: [[u8; 2]; 256],
    /// Dither quantization for red/blue, biased by 8 entries on each side so
    /// diffused error can index past the 0..=255 range.
    pub quant_rb: [u8; 256 + 16],
    /// Dither quantization for green.
    pub quant_g: [u8; 256 + 16],
}

impl CodecTables {
    fn build() -> Self {
        let mut expand5 = [0u8; 32];
        for (i, v) in expand5.iter_mut().enumerate() {
            *v = ((i << 3) | (i >> 2)) as u8;
        }

        let mut expand6 = [0u8; 64];
        for (i, v) in expand6.iter_mut().enumerate() {
            *v = ((i << 2) | (i >> 4)) as u8;
        }

        let mut quant_rb = [0u8; 256 + 16];
        let mut quant_g = [0u8; 256 + 16];
        for i in 0..256 + 16 {
            let v = (i as i32 - 8).clamp(0, 255);
            quant_rb[i] = expand5[mul8bit(v, 31) as usize];
            quant_g[i] = expand6[mul8bit(v, 63) as usize];
        }

        Self {
            omatch5: prepare_opt_table(&expand5),
            omatch6: prepare_opt_table(&expand6),
            expand5,
            expand6,
            quant_rb,
            quant_g,
        }
    }
}

/// Finds, for every possible 8-bit input, the codeword pair whose 2/3-1/3
/// blend lands closest to it.
///
/// The error term includes 3% of the codeword distance: the S3TC spec allows
/// decoders a 3%-of-range interpolation tolerance, so pairs that are closer
/// together are safer across cards.
fn prepare_opt_table(expand: &[u8]) -> [[u8; 2]; 256] {
    let mut table = [[0u8; 2]; 256];

    for (i, entry) in table.iter_mut().enumerate() {
        let mut best_err = i32::MAX;

        for (mn, &mn_e) in expand.iter().enumerate() {
            for (mx, &mx_e) in expand.iter().enumerate() {
                let mine = mn_e as i32;
                let maxe = mx_e as i32;

                let mut err = (maxe + mul8bit(mine - maxe, 0x55) - i as i32).abs();
                err += (maxe - mine).abs() * 3 / 100;

                if err < best_err {
                    best_err = err;
                    *entry = [mx as u8, mn as u8];
                }
            }
        }
    }

    table
}

/// Returns the shared codec tables, building them on first use.
pub(crate) fn tables() -> &'static CodecTables {
    static TABLES: OnceLock<CodecTables> = OnceLock::new();
    TABLES.get_or_init(CodecTables::build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tables_replicate_bits() {
        let t = tables();
        assert_eq!(t.expand5[0], 0);
        assert_eq!(t.expand5[31], 255);
        assert_eq!(t.expand6[0], 0);
        assert_eq!(t.expand6[63], 255);
        // bit replication, not naive scaling
        assert_eq!(t.expand5[16], (16 << 3) | (16 >> 2));
        assert_eq!(t.expand6[32], (32 << 2) | (32 >> 4));
        assert!(t.expand5.windows(2).all(|w| w[0] < w[1]));
        assert!(t.expand6.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn omatch_is_exact_for_representable_values() {
        let t = tables();
        // The degenerate pair (k, k) has zero blend error and zero distance
        // fudge, so whatever pair wins must blend to the value exactly. It is
        // not always (k, k) itself: distinct codewords can tie at zero error
        // and the scan keeps the first one it sees.
        let blend = |maxe: i32, mine: i32| maxe + mul8bit(mine - maxe, 0x55);
        for k in 0..32 {
            let v = t.expand5[k] as i32;
            let [mx, mn] = t.omatch5[v as usize];
            let recon = blend(t.expand5[mx as usize] as i32, t.expand5[mn as usize] as i32);
            assert_eq!(recon, v, "codeword {k}");
        }
        for k in 0..64 {
            let v = t.expand6[k] as i32;
            let [mx, mn] = t.omatch6[v as usize];
            let recon = blend(t.expand6[mx as usize] as i32, t.expand6[mn as usize] as i32);
            assert_eq!(recon, v, "codeword {k}");
        }
    }

    #[test]
    fn quant_tables_clamp_their_slack_range() {
        let t = tables();
        for i in 0..8 {
            assert_eq!(t.quant_rb[i], t.quant_rb[8]);
            assert_eq!(t.quant_g[i], t.quant_g[8]);
        }
        assert_eq!(t.quant_rb[8 + 255], 255);
        assert_eq!(t.quant_g[8 + 255], 255);
        for i in 256 + 8..256 + 16 {
            assert_eq!(t.quant_rb[i], 255);
            assert_eq!(t.quant_g[i], 255);
        }
    }

    #[test]
    fn mul8bit_rounds_like_hardware() {
        assert_eq!(mul8bit(255, 31), 31);
        assert_eq!(mul8bit(255, 63), 63);
        assert_eq!(mul8bit(0, 31), 0);
        assert_eq!(mul8bit(128, 31), 16);
    }
}
