//! Math helpers for the mixing hot path

use std::f64::consts::PI;

const ONE_OVER_PI: f64 = 1.0 / PI;

// Minimax coefficients for an odd polynomial in x^2 (roquen's "newk" set).
const K1: f64 = f64::from_bits(0xbfc5_5555_5555_5469);
const K2: f64 = f64::from_bits(0x3f81_1111_1110_941d);
const K3: f64 = f64::from_bits(0xbf2a_01a0_199e_0eb3);
const K4: f64 = f64::from_bits(0x3ec7_1de3_7e62_aaca);
const K5: f64 = f64::from_bits(0xbe5a_e634_d22b_b47c);
const K6: f64 = f64::from_bits(0x3de6_0e59_ae00_e00c);
const K7: f64 = f64::from_bits(0xbd69_ef5d_594b_3420);

/// Fast polynomial sine approximation, accurate to ~1e-11 after range
/// reduction. Considerably cheaper than `f64::sin` on the per-tap sinc path.
pub fn fast_sin(v: f64) -> f64 {
    let i = (v * ONE_OVER_PI).round();
    let mut x = v - i * PI;
    let qs = 1.0 - 2.0 * ((i as i64) & 1) as f64;
    let x2 = x * x;
    x *= qs;
    let mut r = K7;
    r = r * x2 + K6;
    r = r * x2 + K5;
    r = r * x2 + K4;
    r = r * x2 + K3;
    r = r * x2 + K2;
    r = r * x2 + K1;
    x + x * x2 * r
}

/// Wraps an angle in radians into [-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::PI;
    (angle + PI).rem_euclid(2.0 * PI) - PI
}
