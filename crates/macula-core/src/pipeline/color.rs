//! 8-bit sRGB ↔ CIE L*a*b* conversion.
//!
//! The quantization matches the one the training pipeline used: L* is
//! scaled from [0, 100] to [0, 255], a* and b* are offset by 128. D65
//! white point, sRGB gamma. Changing any of these constants changes the
//! luminance plane the enhancer equalizes, so they are not configurable.

/// D65 reference white.
const XN: f32 = 0.950_456;
const ZN: f32 = 1.088_754;

/// Threshold between the cube-root and linear segments of the Lab
/// transfer function ((6/29)^3).
const LAB_EPSILON: f32 = 0.008_856;

/// Slope of the linear segment (1/3 * (29/6)^2).
const LAB_KAPPA: f32 = 7.787;

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c > 0.003_130_8 {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * c
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(t: f32) -> f32 {
    let cube = t * t * t;
    if cube > LAB_EPSILON {
        cube
    } else {
        (t - 16.0 / 116.0) / LAB_KAPPA
    }
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Convert one sRGB pixel to 8-bit Lab (L, a, b each in 0..=255).
pub fn rgb_to_lab8(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = srgb_to_linear(r as f32 / 255.0);
    let g = srgb_to_linear(g as f32 / 255.0);
    let b = srgb_to_linear(b as f32 / 255.0);

    let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

    let fx = lab_f(x / XN);
    let fy = lab_f(y);
    let fz = lab_f(z / ZN);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    (
        clamp_u8(l * 255.0 / 100.0),
        clamp_u8(a + 128.0),
        clamp_u8(b + 128.0),
    )
}

/// Convert one 8-bit Lab pixel back to sRGB.
pub fn lab8_to_rgb(l: u8, a: u8, b: u8) -> (u8, u8, u8) {
    let l = l as f32 * 100.0 / 255.0;
    let a = a as f32 - 128.0;
    let b = b as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = lab_f_inv(fx) * XN;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * ZN;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
    let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    (
        clamp_u8(linear_to_srgb(r.clamp(0.0, 1.0)) * 255.0),
        clamp_u8(linear_to_srgb(g.clamp(0.0, 1.0)) * 255.0),
        clamp_u8(linear_to_srgb(b.clamp(0.0, 1.0)) * 255.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_and_white_endpoints() {
        let (l, a, b) = rgb_to_lab8(0, 0, 0);
        assert_eq!(l, 0);
        assert!((a as i32 - 128).abs() <= 1);
        assert!((b as i32 - 128).abs() <= 1);

        let (l, a, b) = rgb_to_lab8(255, 255, 255);
        assert_eq!(l, 255);
        assert!((a as i32 - 128).abs() <= 1);
        assert!((b as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_gray_is_achromatic() {
        let (_, a, b) = rgb_to_lab8(128, 128, 128);
        assert!((a as i32 - 128).abs() <= 1);
        assert!((b as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_round_trip_is_close() {
        // Quantization to 8-bit Lab loses at most a couple of levels.
        for &(r, g, b) in &[
            (0u8, 0u8, 0u8),
            (255, 255, 255),
            (128, 128, 128),
            (200, 30, 40),
            (12, 190, 73),
            (90, 60, 200),
        ] {
            let (l, a, bb) = rgb_to_lab8(r, g, b);
            let (r2, g2, b2) = lab8_to_rgb(l, a, bb);
            assert!((r as i32 - r2 as i32).abs() <= 3, "r {r} -> {r2}");
            assert!((g as i32 - g2 as i32).abs() <= 3, "g {g} -> {g2}");
            assert!((b as i32 - b2 as i32).abs() <= 3, "b {b} -> {b2}");
        }
    }

    #[test]
    fn test_red_has_positive_a() {
        let (_, a, _) = rgb_to_lab8(255, 0, 0);
        assert!(a > 128, "red should sit on the positive a* axis");
    }
}
