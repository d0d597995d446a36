//! Fractional-position sample interpolation
//!
//! Every variant degrades to the next cheaper one when its support window
//! would run past either end of the buffer (sinc → cubic → linear →
//! nearest), so interpolation never indexes out of bounds and tapers
//! gracefully at stream boundaries.

use crate::math::fast_sin;
use std::f64::consts::PI;

pub const DEFAULT_SINC_RADIUS: usize = 4;

/// Maps a fractional playback position within a channel-interleaved buffer
/// to a sample value. Deterministic and side-effect free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolator {
    /// Floor sample, no blending.
    Nearest,
    /// Two-point linear blend.
    Linear,
    /// Four-point Catmull-Rom.
    Cubic,
    /// Lanczos-windowed sinc with `2 * radius` taps.
    Sinc { radius: usize },
}

impl Interpolator {
    pub fn sinc() -> Self {
        Self::Sinc {
            radius: DEFAULT_SINC_RADIUS,
        }
    }

    /// Interpolates the sample at `position` for the channel starting at
    /// `offset`, with `stride` samples between consecutive frames.
    pub fn interpolate(&self, samples: &[f32], position: f64, offset: usize, stride: usize) -> f32 {
        match *self {
            Self::Nearest => nearest(samples, position, offset, stride),
            Self::Linear => linear(samples, position, offset, stride),
            Self::Cubic => cubic(samples, position, offset, stride),
            Self::Sinc { radius } => sinc_interpolate(samples, position, offset, stride, radius),
        }
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::Linear
    }
}

fn nearest(samples: &[f32], position: f64, offset: usize, stride: usize) -> f32 {
    samples[position as usize * stride + offset]
}

fn linear(samples: &[f32], position: f64, offset: usize, stride: usize) -> f32 {
    let floor_position = position as usize;
    if (floor_position + 1) * stride + offset >= samples.len() {
        return nearest(samples, position, offset, stride);
    }

    let floor_value = samples[floor_position * stride + offset];
    let ceil_value = samples[(floor_position + 1) * stride + offset];
    floor_value + (ceil_value - floor_value) * (position - floor_position as f64) as f32
}

fn cubic(samples: &[f32], position: f64, offset: usize, stride: usize) -> f32 {
    let center = position as usize;
    if center < 1 || (center + 2) * stride + offset >= samples.len() {
        return linear(samples, position, offset, stride);
    }

    let x0 = samples[(center - 1) * stride + offset];
    let x1 = samples[center * stride + offset];
    let x2 = samples[(center + 1) * stride + offset];
    let x3 = samples[(center + 2) * stride + offset];

    let a0 = -0.5 * x0 + 1.5 * x1 - 1.5 * x2 + 0.5 * x3;
    let a1 = x0 - 2.5 * x1 + 2.0 * x2 - 0.5 * x3;
    let a2 = -0.5 * x0 + 0.5 * x2;
    let a3 = x1;

    let t = (position - center as f64) as f32;
    ((a0 * t + a1) * t + a2) * t + a3
}

fn sinc_interpolate(
    samples: &[f32],
    position: f64,
    offset: usize,
    stride: usize,
    radius: usize,
) -> f32 {
    let center = position as usize;
    if radius == 0 {
        return cubic(samples, position, offset, stride);
    }
    let Some(first_tap) = (center + 1).checked_sub(radius) else {
        return cubic(samples, position, offset, stride);
    };
    let last_tap = center + radius;
    if last_tap * stride + offset >= samples.len() {
        return cubic(samples, position, offset, stride);
    }

    let mut sum = 0.0f32;
    let mut weight_sum = 0.0f32;
    for tap in first_tap..=last_tap {
        let distance = (position - tap as f64) as f32;
        // Normalizing by the weight sum keeps edge taps clipped by the
        // Lanczos window from attenuating the output.
        let weight = sinc(distance) * lanczos_window(distance / radius as f32);
        sum += samples[tap * stride + offset] * weight;
        weight_sum += weight;
    }
    sum / weight_sum
}

fn lanczos_window(x: f32) -> f32 {
    if x <= -1.0 || x >= 1.0 {
        return 0.0;
    }
    sinc(x)
}

fn sinc(x: f32) -> f32 {
    if x == 0.0 {
        return 1.0;
    }
    let pix = PI * x as f64;
    (fast_sin(pix) / pix) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLES: [f32; 12] = [
        0.0, 0.1, 0.5, 0.9, 0.4, -0.2, -0.7, -0.9, -0.3, 0.2, 0.6, 0.8,
    ];

    #[test]
    fn integer_positions_return_exact_samples() {
        for interpolator in [
            Interpolator::Nearest,
            Interpolator::Linear,
            Interpolator::Cubic,
            Interpolator::sinc(),
        ] {
            for (i, &expected) in SAMPLES.iter().enumerate() {
                let value = interpolator.interpolate(&SAMPLES, i as f64, 0, 1);
                assert_abs_diff_eq!(value, expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn linear_blends_midpoints() {
        let value = Interpolator::Linear.interpolate(&SAMPLES, 1.5, 0, 1);
        assert_abs_diff_eq!(value, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn linear_does_not_extrapolate_past_last_sample() {
        let value = Interpolator::Linear.interpolate(&SAMPLES, 11.5, 0, 1);
        assert_abs_diff_eq!(value, SAMPLES[11], epsilon = 1e-6);
    }

    #[test]
    fn cubic_falls_back_to_linear_near_edges() {
        for position in [0.25, 10.5] {
            let cubic = Interpolator::Cubic.interpolate(&SAMPLES, position, 0, 1);
            let linear = Interpolator::Linear.interpolate(&SAMPLES, position, 0, 1);
            assert_abs_diff_eq!(cubic, linear, epsilon = 1e-6);
        }
    }

    #[test]
    fn sinc_falls_back_to_cubic_near_edges() {
        for position in [1.5, 9.5] {
            let sinc = Interpolator::sinc().interpolate(&SAMPLES, position, 0, 1);
            let cubic = Interpolator::Cubic.interpolate(&SAMPLES, position, 0, 1);
            assert_abs_diff_eq!(sinc, cubic, epsilon = 1e-6);
        }
    }

    #[test]
    fn interpolation_respects_channel_stride() {
        // Interleaved stereo: left channel ascending, right channel constant
        let samples = [0.0, 1.0, 0.2, 1.0, 0.4, 1.0, 0.6, 1.0, 0.8, 1.0];
        let left = Interpolator::Linear.interpolate(&samples, 1.5, 0, 2);
        let right = Interpolator::Linear.interpolate(&samples, 1.5, 1, 2);
        assert_abs_diff_eq!(left, 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(right, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn sinc_reconstructs_a_sine_accurately() {
        let samples: Vec<f32> = (0..64)
            .map(|i| (i as f32 * 0.2).sin() * 0.8)
            .collect();
        let interpolator = Interpolator::sinc();
        for i in 10..50 {
            let position = i as f64 + 0.37;
            let value = interpolator.interpolate(&samples, position, 0, 1);
            let expected = (position as f32 * 0.2).sin() * 0.8;
            assert_abs_diff_eq!(value, expected, epsilon = 2e-3);
        }
    }
}
