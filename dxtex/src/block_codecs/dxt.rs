//! Core DXT block compression: endpoint selection, index matching, iterative
//! least-squares refinement and the bit-exact wire emission.
//!
//! Everything in here operates on a single 4x4 tile of pixels and is pure with
//! respect to its inputs once the shared [`tables`] have been built.

use byteorder::{ByteOrder, LittleEndian};

use super::tables::{mul8bit, tables, CodecTables};

/// A 32-bit ARGB pixel with a fixed channel layout (alpha in the top byte),
/// independent of the host CPU's byte order.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Pixel(pub u32);

impl Pixel {
    pub fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    /// Quantizes to RGB565 with the same rounding the reference rasterizers
    /// use when downsampling 8-bit channels.
    pub fn as_16bit(self) -> u16 {
        let r = mul8bit(self.r() as i32, 31);
        let g = mul8bit(self.g() as i32, 63);
        let b = mul8bit(self.b() as i32, 31);
        ((r << 11) | (g << 5) | b) as u16
    }

    /// Expands an RGB565 value through the bit-replication tables. Alpha is
    /// forced opaque; the color block never carries alpha.
    pub fn from_16bit(v: u16, t: &CodecTables) -> Self {
        Self::new(
            255,
            t.expand5[(v >> 11) as usize & 31],
            t.expand6[(v >> 5) as usize & 63],
            t.expand5[v as usize & 31],
        )
    }

    fn rgb(self) -> u32 {
        self.0 & 0x00ff_ffff
    }
}

fn dist2(a: Pixel, b: Pixel) -> u32 {
    let dr = a.r() as i32 - b.r() as i32;
    let dg = a.g() as i32 - b.g() as i32;
    let db = a.b() as i32 - b.b() as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// 2/3-1/3 blend, matching the hardware interpolator.
fn lerp13(a: i32, b: i32) -> i32 {
    (a * 2 + b) / 3
}

/// The four candidate colors a decoder derives from an endpoint pair:
/// both endpoints expanded, plus the two thirds blends.
fn eval_colors(max16: u16, min16: u16, t: &CodecTables) -> [Pixel; 4] {
    let c0 = Pixel::from_16bit(max16, t);
    let c1 = Pixel::from_16bit(min16, t);
    let blend = |a: Pixel, b: Pixel| {
        Pixel::new(
            255,
            lerp13(a.r() as i32, b.r() as i32) as u8,
            lerp13(a.g() as i32, b.g() as i32) as u8,
            lerp13(a.b() as i32, b.b() as i32) as u8,
        )
    };
    [c0, c1, blend(c0, c1), blend(c1, c0)]
}

/// Number of power iterations used to find the principal axis.
const N_ITER_POWER: usize = 4;

/// Picks the initial endpoint pair for a block via principal component
/// analysis of the RGB distribution.
///
/// The dominant eigenvector of the covariance matrix is approximated with a
/// few power iterations seeded by the channel-range vector; near-degenerate
/// blocks fall back to a fixed luminance direction. The two pixels at the
/// extreme projections onto that axis become the endpoints.
fn optimize_colors_block(block: &[Pixel; 16]) -> (u16, u16) {
    // per-channel mean and range
    let mut mu = [0i32; 3];
    let mut min = [255i32; 3];
    let mut max = [0i32; 3];
    for ch in 0..3 {
        let mut sum = 0;
        for px in block {
            let v = match ch {
                0 => px.r(),
                1 => px.g(),
                _ => px.b(),
            } as i32;
            sum += v;
            min[ch] = min[ch].min(v);
            max[ch] = max[ch].max(v);
        }
        mu[ch] = (sum + 8) >> 4;
    }

    // covariance matrix of the deviations, packed symmetric
    let mut cov = [0i32; 6];
    for px in block {
        let r = px.r() as i32 - mu[0];
        let g = px.g() as i32 - mu[1];
        let b = px.b() as i32 - mu[2];
        cov[0] += r * r;
        cov[1] += r * g;
        cov[2] += r * b;
        cov[3] += g * g;
        cov[4] += g * b;
        cov[5] += b * b;
    }

    let mut covf = [0f32; 6];
    for (f, &c) in covf.iter_mut().zip(&cov) {
        *f = c as f32 / 255.0;
    }

    let mut vfr = (max[0] - min[0]) as f32;
    let mut vfg = (max[1] - min[1]) as f32;
    let mut vfb = (max[2] - min[2]) as f32;

    for _ in 0..N_ITER_POWER {
        let r = vfr * covf[0] + vfg * covf[1] + vfb * covf[2];
        let g = vfr * covf[1] + vfg * covf[3] + vfb * covf[4];
        let b = vfr * covf[2] + vfg * covf[4] + vfb * covf[5];
        vfr = r;
        vfg = g;
        vfb = b;
    }

    let magn = vfr.abs().max(vfg.abs()).max(vfb.abs());

    let (v_r, v_g, v_b);
    if magn < 4.0 {
        // axis too small, use luminance weights instead
        v_r = 148;
        v_g = 300;
        v_b = 58;
    } else {
        let scale = 512.0 / magn;
        v_r = (vfr * scale) as i32;
        v_g = (vfg * scale) as i32;
        v_b = (vfb * scale) as i32;
    }

    // pick the pixels at the extreme projections
    let mut min_d = i32::MAX;
    let mut max_d = i32::MIN;
    let mut min_p = block[0];
    let mut max_p = block[0];
    for &px in block {
        let dot = px.r() as i32 * v_r + px.g() as i32 * v_g + px.b() as i32 * v_b;
        if dot < min_d {
            min_d = dot;
            min_p = px;
        }
        if dot > max_d {
            max_d = dot;
            max_p = px;
        }
    }

    (max_p.as_16bit(), min_p.as_16bit())
}

/// Assigns each pixel its 2-bit index against a candidate endpoint pair and
/// reports the total squared RGB error of the assignment.
///
/// Pixels are projected onto the endpoint axis and classified against the
/// three breakpoint dot products. With `dither` set, the projection error is
/// diffused Floyd-Steinberg style (7/16, 5/16, 3/16, 1/16 in raster order),
/// staying within the block.
fn match_colors_block(
    block: &[Pixel; 16],
    max16: u16,
    min16: u16,
    dither: bool,
    t: &CodecTables,
) -> (u32, u32) {
    let colors = eval_colors(max16, min16, t);
    let dir_r = colors[0].r() as i32 - colors[1].r() as i32;
    let dir_g = colors[0].g() as i32 - colors[1].g() as i32;
    let dir_b = colors[0].b() as i32 - colors[1].b() as i32;

    let mut dots = [0i32; 16];
    for (d, px) in dots.iter_mut().zip(block) {
        *d = px.r() as i32 * dir_r + px.g() as i32 * dir_g + px.b() as i32 * dir_b;
    }

    let mut stops = [0i32; 4];
    for (s, c) in stops.iter_mut().zip(&colors) {
        *s = c.r() as i32 * dir_r + c.g() as i32 * dir_g + c.b() as i32 * dir_b;
    }

    // Breakpoints halfway between the projected candidate colors. Indices are
    // in wire order: 0 = max, 1 = min, 2 and 3 the blends towards each.
    let mut c0_point = (stops[1] + stops[3]) >> 1;
    let mut half_point = (stops[3] + stops[2]) >> 1;
    let mut c3_point = (stops[2] + stops[0]) >> 1;

    let mut mask = 0u32;
    let mut error = 0u32;

    if !dither {
        for i in (0..16).rev() {
            mask <<= 2;
            let dot = dots[i];
            let step = if dot < half_point {
                if dot < c0_point {
                    1
                } else {
                    3
                }
            } else if dot < c3_point {
                2
            } else {
                0
            };
            mask |= step;
            error += dist2(block[i], colors[step as usize]);
        }
    } else {
        // Error rows for the current and previous scanline, swapped per row.
        let mut err = [0i32; 8];
        let mut e1 = 0usize;
        let mut e2 = 4usize;

        c0_point <<= 4;
        half_point <<= 4;
        c3_point <<= 4;

        for y in 0..4 {
            let mut row_mask = 0u32;
            for x in 0..4 {
                let i = y * 4 + x;
                let mut dot = dots[i] << 4;
                if x > 0 {
                    dot += 7 * err[e1 + x - 1] + err[e2 + x - 1];
                }
                dot += 5 * err[e2 + x];
                if x < 3 {
                    dot += 3 * err[e2 + x + 1];
                }

                let step = if dot < half_point {
                    if dot < c0_point {
                        1
                    } else {
                        3
                    }
                } else if dot < c3_point {
                    2
                } else {
                    0
                };

                err[e1 + x] = dots[i] - stops[step as usize];
                row_mask |= step << (x * 2);
                error += dist2(block[i], colors[step as usize]);
            }
            mask |= row_mask << (y * 8);
            std::mem::swap(&mut e1, &mut e2);
        }
    }

    (mask, error)
}

const W1_TAB: [i32; 4] = [3, 0, 2, 1];
// Packed per-index contributions to the 2x2 normal-equations accumulator:
// xx in bits 16.., yy in bits 8.., xy in the low byte.
const PRODS: [i32; 4] = [0x090000, 0x000900, 0x040102, 0x010402];

/// Recomputes the endpoint pair minimizing total squared error for a fixed
/// index assignment (2-variable least squares, solved by Cramer's rule).
///
/// Returns whether either endpoint actually moved, which the caller uses to
/// detect convergence.
fn refine_block(
    block: &[Pixel; 16],
    max16: &mut u16,
    min16: &mut u16,
    mask: u32,
    t: &CodecTables,
) -> bool {
    let old_max = *max16;
    let old_min = *min16;

    let (new_max, new_min);
    if (mask ^ (mask << 2)) < 4 {
        // All pixels share one index, so the system is singular; use the
        // optimal single-color match for the average color instead.
        let mut r = 8i32;
        let mut g = 8i32;
        let mut b = 8i32;
        for px in block {
            r += px.r() as i32;
            g += px.g() as i32;
            b += px.b() as i32;
        }
        r >>= 4;
        g >>= 4;
        b >>= 4;

        new_max = ((t.omatch5[r as usize][0] as u16) << 11)
            | ((t.omatch6[g as usize][0] as u16) << 5)
            | t.omatch5[b as usize][0] as u16;
        new_min = ((t.omatch5[r as usize][1] as u16) << 11)
            | ((t.omatch6[g as usize][1] as u16) << 5)
            | t.omatch5[b as usize][1] as u16;
    } else {
        let mut at1 = [0i32; 3];
        let mut at2 = [0i32; 3];
        let mut akku = 0i32;
        let mut cm = mask;

        for px in block {
            let step = (cm & 3) as usize;
            cm >>= 2;
            let w1 = W1_TAB[step];
            let r = px.r() as i32;
            let g = px.g() as i32;
            let b = px.b() as i32;

            akku += PRODS[step];
            at1[0] += w1 * r;
            at1[1] += w1 * g;
            at1[2] += w1 * b;
            at2[0] += r;
            at2[1] += g;
            at2[2] += b;
        }

        for (a2, a1) in at2.iter_mut().zip(&at1) {
            *a2 = 3 * *a2 - *a1;
        }

        let xx = akku >> 16;
        let yy = (akku >> 8) & 0xff;
        let xy = akku & 0xff;

        let frb = 3.0f32 * 31.0 / 255.0 / (xx * yy - xy * xy) as f32;
        let fg = frb * 63.0 / 31.0;

        let solve = |a1: i32, a2: i32, f: f32, limit: i32| -> u16 {
            let x = ((a1 * yy - a2 * xy) as f32 * f + 0.5) as i32;
            x.clamp(0, limit) as u16
        };
        let solve_min = |a1: i32, a2: i32, f: f32, limit: i32| -> u16 {
            let x = ((a2 * xx - a1 * xy) as f32 * f + 0.5) as i32;
            x.clamp(0, limit) as u16
        };

        new_max = (solve(at1[0], at2[0], frb, 31) << 11)
            | (solve(at1[1], at2[1], fg, 63) << 5)
            | solve(at1[2], at2[2], frb, 31);
        new_min = (solve_min(at1[0], at2[0], frb, 31) << 11)
            | (solve_min(at1[1], at2[1], fg, 63) << 5)
            | solve_min(at1[2], at2[2], frb, 31);
    }

    *max16 = new_max;
    *min16 = new_min;
    old_max != new_max || old_min != new_min
}

/// Produces a copy of the block quantized with per-channel Floyd-Steinberg
/// error diffusion through the dither tables. Used to precondition the
/// optimizer and refiner when dithering is enabled.
fn dither_block(block: &[Pixel; 16], t: &CodecTables) -> [Pixel; 16] {
    let mut channels = [[0i32; 16]; 3];
    for (i, px) in block.iter().enumerate() {
        channels[0][i] = px.r() as i32;
        channels[1][i] = px.g() as i32;
        channels[2][i] = px.b() as i32;
    }

    for (ch, values) in channels.iter_mut().enumerate() {
        let quant: &[u8] = if ch == 1 { &t.quant_g } else { &t.quant_rb };
        let mut err = [0i32; 8];
        let mut e1 = 0usize;
        let mut e2 = 4usize;

        for y in 0..4 {
            for x in 0..4 {
                let i = y * 4 + x;
                let mut diffused = 5 * err[e2 + x];
                if x > 0 {
                    diffused += 7 * err[e1 + x - 1] + err[e2 + x - 1];
                }
                if x < 3 {
                    diffused += 3 * err[e2 + x + 1];
                }

                let idx = (values[i] + (diffused >> 4) + 8).clamp(0, 271) as usize;
                let q = quant[idx] as i32;
                err[e1 + x] = values[i] - q;
                values[i] = q;
            }
            std::mem::swap(&mut e1, &mut e2);
        }
    }

    let mut out = [Pixel::default(); 16];
    for (i, px) in out.iter_mut().enumerate() {
        *px = Pixel::new(
            block[i].a(),
            channels[0][i] as u8,
            channels[1][i] as u8,
            channels[2][i] as u8,
        );
    }
    out
}

/// Encodes the 8-byte interpolated-ramp alpha block: max, min, then sixteen
/// 3-bit ramp indices packed LSB-first.
///
/// Given the chosen min/max, the index ladder below is exact, so no search or
/// refinement is needed.
fn compress_alpha_block(dest: &mut Vec<u8>, block: &[Pixel; 16]) {
    let mut mn = block[0].a() as i32;
    let mut mx = mn;
    for px in &block[1..] {
        let a = px.a() as i32;
        if a < mn {
            mn = a;
        } else if a > mx {
            mx = a;
        }
    }

    // endpoints are stored verbatim
    dest.push(mx as u8);
    dest.push(mn as u8);

    let dist = mx - mn;
    let dist4 = dist * 4;
    let dist2 = dist * 2;
    let bias = if dist < 8 { dist - 1 } else { dist / 2 + 2 } - mn * 7;

    let mut bits = 0u32;
    let mut acc = 0u32;
    for px in block {
        let mut a = px.a() as i32 * 7 + bias;

        // branchless nearest-ramp-step select: a linear 0..7 scale first
        let t = if a >= dist4 { -1i32 } else { 0 };
        let mut ind = t & 4;
        a -= dist4 & t;
        let t = if a >= dist2 { -1i32 } else { 0 };
        ind += t & 2;
        a -= dist2 & t;
        ind += (a >= dist) as i32;

        // then remapped to the wire convention where 0/1 are the endpoints
        ind = -ind & 7;
        ind ^= (2 > ind) as i32;

        acc |= (ind as u32) << bits;
        bits += 3;
        if bits >= 8 {
            dest.push(acc as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
}

/// Encodes the 8-byte color block: endpoint selection, optional dithering,
/// error-driven refinement, ordering fix-up and little-endian emission.
fn compress_color_block(dest: &mut Vec<u8>, block: &[Pixel; 16], quality: u8) {
    let t = tables();
    let dither = quality & 0x80 != 0;
    let level = quality & 0x7f;

    let mut max16;
    let mut min16;
    let mut mask;

    if block.iter().all(|px| px.rgb() == block[0].rgb()) {
        // Constant blocks take the precomputed single-color match; alpha does
        // not participate in the color block.
        let r = block[0].r() as usize;
        let g = block[0].g() as usize;
        let b = block[0].b() as usize;
        mask = 0xaaaa_aaaa;
        max16 = ((t.omatch5[r][0] as u16) << 11)
            | ((t.omatch6[g][0] as u16) << 5)
            | t.omatch5[b][0] as u16;
        min16 = ((t.omatch5[r][1] as u16) << 11)
            | ((t.omatch6[g][1] as u16) << 5)
            | t.omatch5[b][1] as u16;
    } else {
        let dithered;
        let pca_block = if dither {
            dithered = dither_block(block, t);
            &dithered
        } else {
            block
        };

        let opt = optimize_colors_block(pca_block);
        max16 = opt.0;
        min16 = opt.1;

        let mut error;
        if max16 != min16 {
            let m = match_colors_block(block, max16, min16, dither, t);
            mask = m.0;
            error = m.1;
        } else {
            mask = 0;
            let single = Pixel::from_16bit(max16, t);
            error = block.iter().map(|&px| dist2(px, single)).sum();
        }

        let iterations = if level == 0 { 0 } else { 3 };
        for _ in 0..iterations {
            let mut try_max = max16;
            let mut try_min = min16;
            if !refine_block(pca_block, &mut try_max, &mut try_min, mask, t) {
                break;
            }
            if try_max == try_min {
                break;
            }
            let (try_mask, try_err) = match_colors_block(block, try_max, try_min, dither, t);
            if try_err < error {
                max16 = try_max;
                min16 = try_min;
                mask = try_mask;
                error = try_err;
            } else {
                break;
            }
        }
    }

    // The wire format selects 4-color vs 3-color mode by comparing the two
    // stored endpoints, so their order carries meaning: keep max16 first and
    // remap the indices when a swap is needed.
    if max16 < min16 {
        std::mem::swap(&mut max16, &mut min16);
        mask ^= 0x5555_5555;
    }

    let mut out = [0u8; 8];
    LittleEndian::write_u16(&mut out[0..2], max16);
    LittleEndian::write_u16(&mut out[2..4], min16);
    LittleEndian::write_u32(&mut out[4..8], mask);
    dest.extend_from_slice(&out);
}

/// Compresses one 4x4 tile, appending 8 bytes (color only) or 16 bytes
/// (alpha block followed by color block) to `dest`.
pub(crate) fn compress_block_pixels(
    dest: &mut Vec<u8>,
    block: &[Pixel; 16],
    has_alpha: bool,
    quality: u8,
) {
    if has_alpha {
        compress_alpha_block(dest, block);
    }
    compress_color_block(dest, block, quality);
}

/// Compresses a single 4x4 tile of packed ARGB pixels (row-major, alpha in
/// the top byte of each value), appending the encoded block to `dest`.
///
/// With `has_alpha` set, an 8-byte interpolated-alpha block precedes the
/// 8-byte color block. `quality` bits 0-6 select the number of refinement
/// passes (0 skips refinement); bit 7 (`0x80`) enables Floyd-Steinberg
/// dithering.
pub fn compress_block(dest: &mut Vec<u8>, pixels: &[u32; 16], has_alpha: bool, quality: u8) {
    let mut block = [Pixel::default(); 16];
    for (px, &raw) in block.iter_mut().zip(pixels) {
        *px = Pixel(raw);
    }
    compress_block_pixels(dest, &block, has_alpha, quality);
}
