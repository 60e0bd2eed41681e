use std::f32::consts::PI;
use anyhow::{Result, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Scene, Tree, GROUND_HALF_SIZE};
use crate::color::Color;

// A brush wider than the whole ground has nothing left to spread over
pub const MAX_BRUSH_DISTANCE: f32 = 2.0 * GROUND_HALF_SIZE;

pub fn validate_brush_distance(distance: f32) -> Result<()> {
    if !(distance > 0.0 && distance <= MAX_BRUSH_DISTANCE) {
        bail!("invalid brush distance {distance}, it must be in (0, {MAX_BRUSH_DISTANCE}]");
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlantingMode {
    Single,
    /// Scatters trees around the point. `distance` is both the brush radius and the minimum
    /// distance between trees.
    Brush { distance: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub height_min: f32,
    pub height_max: f32,
    pub color: Color,
}

impl Default for TreeParams {
    fn default() -> TreeParams {
        TreeParams {
            height_min: 5.0,
            height_max: 15.0,
            color: Color::new(0x22, 0x8b, 0x22),
        }
    }
}

impl TreeParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.height_min > 0.0 && self.height_min <= self.height_max && self.height_max.is_finite()) {
            bail!("invalid tree height range {} .. {}", self.height_min, self.height_max);
        }
        Ok(())
    }
    fn random_height(&self, rng: &mut impl Rng) -> f32 {
        if self.height_min == self.height_max {
            self.height_min
        } else {
            rng.gen_range(self.height_min .. self.height_max)
        }
    }
}

fn is_position_free(scene: &Scene, x: f32, z: f32, min_distance: f32) -> bool {
    scene.trees.iter().all(|t| t.distance_xz(x, z) >= min_distance)
}

/// Plants trees around `(x, z)` on the ground. Returns how many trees were planted.
///
/// In brush mode `floor(2 * distance)` trees are wanted, but candidates closer than `distance`
/// to any tree are rejected, and after ten times that many attempts it gives up.
pub fn plant(scene: &mut Scene, rng: &mut impl Rng, x: f32, z: f32, mode: PlantingMode, params: &TreeParams) -> Result<usize> {
    params.validate()?;
    match mode {
        PlantingMode::Single => {
            let height = params.random_height(rng);
            scene.trees.push(Tree::new(x, z, height, params.color));
            Ok(1)
        }
        PlantingMode::Brush { distance } => {
            validate_brush_distance(distance)?;
            let wanted = (distance * 2.0).floor() as usize;
            let max_attempts = wanted.saturating_mul(10);
            let mut planted = 0;
            let mut attempts = 0;
            while planted < wanted && attempts < max_attempts {
                attempts += 1;
                let angle = rng.gen_range(0.0 .. 2.0 * PI);
                let radius = rng.gen_range(0.0 .. distance);
                let tx = x + angle.cos() * radius;
                let tz = z + angle.sin() * radius;
                if tx.abs() > GROUND_HALF_SIZE || tz.abs() > GROUND_HALF_SIZE {
                    continue;
                }
                if !is_position_free(scene, tx, tz, distance) {
                    continue;
                }
                let height = params.random_height(rng);
                let color = params.color.adjusted(rng.gen_range(-0.1 .. 0.1));
                scene.trees.push(Tree::new(tx, tz, height, color));
                planted += 1;
            }
            log::debug!("brush planted {planted} of {wanted} trees in {attempts} attempts");
            Ok(planted)
        }
    }
}
