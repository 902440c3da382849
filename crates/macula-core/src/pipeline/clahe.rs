//! Contrast Limited Adaptive Histogram Equalization on the luminance plane.
//!
//! This reproduces the enhancement the model was trained with: the image
//! is converted to Lab, the L channel is equalized per-tile on an 8×8 grid
//! with a contrast clip limit of 2.0, and the chrominance channels pass
//! through untouched. The tile grid and clip limit are frozen training
//! parameters — any deviation shifts the input distribution the model was
//! calibrated on.
//!
//! Note that equalization is not idempotent: applying `enhance` twice does
//! not equal applying it once. Callers must invoke it exactly once per
//! image, in the position the preprocessing contract fixes.

use image::RgbImage;

use super::color::{lab8_to_rgb, rgb_to_lab8};

/// Tiling grid: 8 columns × 8 rows.
const TILE_GRID: usize = 8;

/// Contrast clip limit, relative to a uniform histogram.
const CLIP_LIMIT: f32 = 2.0;

/// Histogram bins for an 8-bit plane.
const HIST_SIZE: usize = 256;

/// Apply CLAHE-based color enhancement.
///
/// Same dimensions and channel count as the input. Well-formed 3-channel
/// input cannot fail; degenerate sizes (down to 1×1) are handled.
pub fn enhance(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();

    // Split into Lab planes.
    let pixels = (width * height) as usize;
    let mut l_plane = vec![0u8; pixels];
    let mut a_plane = vec![0u8; pixels];
    let mut b_plane = vec![0u8; pixels];
    for (i, px) in image.as_raw().chunks_exact(3).enumerate() {
        let (l, a, b) = rgb_to_lab8(px[0], px[1], px[2]);
        l_plane[i] = l;
        a_plane[i] = a;
        b_plane[i] = b;
    }

    let l_eq = equalize_plane(&l_plane, width as usize, height as usize);

    // Recombine with untouched chrominance and convert back.
    let mut out = vec![0u8; pixels * 3];
    for i in 0..pixels {
        let (r, g, b) = lab8_to_rgb(l_eq[i], a_plane[i], b_plane[i]);
        out[i * 3] = r;
        out[i * 3 + 1] = g;
        out[i * 3 + 2] = b;
    }

    // Length matches width * height * 3 by construction.
    RgbImage::from_raw(width, height, out).unwrap()
}

/// CLAHE on a single 8-bit plane.
fn equalize_plane(plane: &[u8], width: usize, height: usize) -> Vec<u8> {
    // Tile sizes round up; the plane is padded by edge reflection to a
    // multiple of the grid so every tile has the same (non-zero) area.
    let tile_w = width.div_ceil(TILE_GRID).max(1);
    let tile_h = height.div_ceil(TILE_GRID).max(1);
    let padded_w = tile_w * TILE_GRID;
    let padded_h = tile_h * TILE_GRID;

    let padded = pad_reflect(plane, width, height, padded_w, padded_h);

    let tile_area = tile_w * tile_h;
    // Absolute clip: relative limit scaled by how full a uniform bin would
    // be, floored at one count per bin.
    let clip = ((CLIP_LIMIT * tile_area as f32 / HIST_SIZE as f32) as u32).max(1);

    // Per-tile lookup tables from the clipped histogram CDF.
    let mut luts = vec![[0u8; HIST_SIZE]; TILE_GRID * TILE_GRID];
    for ty in 0..TILE_GRID {
        for tx in 0..TILE_GRID {
            let mut hist = [0u32; HIST_SIZE];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let row = &padded[y * padded_w + tx * tile_w..y * padded_w + (tx + 1) * tile_w];
                for &v in row {
                    hist[v as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clip);

            let scale = 255.0 / tile_area as f32;
            let lut = &mut luts[ty * TILE_GRID + tx];
            let mut sum = 0u32;
            for (bin, entry) in lut.iter_mut().enumerate() {
                sum += hist[bin];
                *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    // Bilinear interpolation between the four surrounding tile LUTs.
    let mut out = vec![0u8; width * height];
    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    for y in 0..height {
        let tyf = y as f32 * inv_th - 0.5;
        let ty0 = tyf.floor();
        let ya = tyf - ty0;
        let ty1 = (ty0 as isize).clamp(0, TILE_GRID as isize - 1) as usize;
        let ty2 = ((ty0 as isize + 1).clamp(0, TILE_GRID as isize - 1)) as usize;

        for x in 0..width {
            let txf = x as f32 * inv_tw - 0.5;
            let tx0 = txf.floor();
            let xa = txf - tx0;
            let tx1 = (tx0 as isize).clamp(0, TILE_GRID as isize - 1) as usize;
            let tx2 = ((tx0 as isize + 1).clamp(0, TILE_GRID as isize - 1)) as usize;

            let v = plane[y * width + x] as usize;
            let p00 = luts[ty1 * TILE_GRID + tx1][v] as f32;
            let p01 = luts[ty1 * TILE_GRID + tx2][v] as f32;
            let p10 = luts[ty2 * TILE_GRID + tx1][v] as f32;
            let p11 = luts[ty2 * TILE_GRID + tx2][v] as f32;

            let top = p00 * (1.0 - xa) + p01 * xa;
            let bottom = p10 * (1.0 - xa) + p11 * xa;
            out[y * width + x] = (top * (1.0 - ya) + bottom * ya).round() as u8;
        }
    }

    out
}

/// Clip histogram bins at `clip` and spread the excess uniformly, with the
/// integer residual stepped across the bins.
fn clip_histogram(hist: &mut [u32; HIST_SIZE], clip: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let batch = clipped / HIST_SIZE as u32;
    let mut residual = clipped - batch * HIST_SIZE as u32;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (HIST_SIZE as u32 / residual).max(1) as usize;
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Pad a plane to `padded_w` × `padded_h` by reflecting across the last
/// row/column (the border itself is not duplicated).
fn pad_reflect(
    plane: &[u8],
    width: usize,
    height: usize,
    padded_w: usize,
    padded_h: usize,
) -> Vec<u8> {
    let mut padded = vec![0u8; padded_w * padded_h];
    for y in 0..padded_h {
        let sy = reflect_index(y, height);
        for x in 0..padded_w {
            let sx = reflect_index(x, width);
            padded[y * padded_w + x] = plane[sy * width + sx];
        }
    }
    padded
}

#[inline]
fn reflect_index(i: usize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let mut i = i as isize;
    let n = n as isize;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * (n - 1) - i;
        } else {
            return i as usize;
        }
    }
}
