use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::math::{fast_sin, wrap_angle};
use crate::modifier::SoundModifier;
use glam::Vec3;

/// Positions a sound relative to a listener: distance drives a linear
/// attenuation out to `max_distance`, and the horizontal bearing drives a
/// stereo balance. Mono blocks only get the attenuation.
///
/// Listener space follows the usual right-handed audio convention with
/// -Z as the forward axis and +X to the listener's right; positive `yaw`
/// turns the listener toward +X.
pub struct SpatialModifier {
    source_position: Vec3,
    listener_position: Vec3,
    listener_yaw: f32,
    max_distance: f32,
    right_weight: f32,
    attenuation: f32,
    dirty: bool,
}

impl SpatialModifier {
    pub fn new(source_position: Vec3, max_distance: f32) -> Result<Self> {
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Max distance must be greater than 0, got {max_distance}"
            )));
        }
        Ok(Self {
            source_position,
            listener_position: Vec3::ZERO,
            listener_yaw: 0.0,
            max_distance,
            right_weight: 0.5,
            attenuation: 1.0,
            dirty: true,
        })
    }

    pub fn source_position(&self) -> Vec3 {
        self.source_position
    }

    pub fn set_source_position(&mut self, position: Vec3) {
        self.source_position = position;
        self.dirty = true;
    }

    pub fn set_listener(&mut self, position: Vec3, yaw: f32) {
        self.listener_position = position;
        self.listener_yaw = yaw;
        self.dirty = true;
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn set_max_distance(&mut self, max_distance: f32) -> Result<()> {
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Max distance must be greater than 0, got {max_distance}"
            )));
        }
        self.max_distance = max_distance;
        self.dirty = true;
        Ok(())
    }

    fn recalculate(&mut self) {
        self.dirty = false;
        let delta = self.source_position - self.listener_position;
        let distance = delta.length();
        if distance >= self.max_distance {
            self.right_weight = 0.5;
            self.attenuation = 0.0;
            return;
        }
        self.attenuation = 1.0 - distance / self.max_distance;
        if distance < 1e-6 {
            self.right_weight = 0.5;
            return;
        }
        let bearing = wrap_angle(delta.x.atan2(-delta.z) - self.listener_yaw);
        self.right_weight = (fast_sin(bearing as f64) as f32 + 1.0) / 2.0;
    }
}

impl SoundModifier for SpatialModifier {
    fn modify(&mut self, format: &AudioFormat, samples: &mut [f32]) {
        if self.dirty {
            self.recalculate();
        }
        if format.channels() == 2 {
            let left = (1.0 - self.right_weight) * self.attenuation;
            let right = self.right_weight * self.attenuation;
            for frame in samples.chunks_exact_mut(2) {
                frame[0] *= left;
                frame[1] *= right;
            }
        } else {
            for sample in samples.iter_mut() {
                *sample *= self.attenuation;
            }
        }
    }
}
