//! Smooth camera that trails a moving target

use crate::core::geo::{Point, Size};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Eases the view center towards a target instead of snapping to it.
///
/// The result of [`FollowCamera::update`] is meant to be passed straight to
/// [`BufferedRenderer::center`](crate::BufferedRenderer::center), which
/// still applies map clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowCamera {
    /// Share of the remaining distance closed per second, in `(0, 1]`.
    lerp_factor: f64,
    /// Box around the current center inside which the target may move
    /// without the camera following.
    deadzone: Option<Size>,
}

impl FollowCamera {
    /// A `lerp_factor` of 1.0 snaps to the target on every update.
    pub fn new(lerp_factor: f64) -> Result<Self> {
        if !lerp_factor.is_finite() || lerp_factor <= 0.0 || lerp_factor > 1.0 {
            return Err(MapError::InvalidConfiguration(format!(
                "follow lerp factor must be in (0, 1], got {lerp_factor}"
            )));
        }
        Ok(Self {
            lerp_factor,
            deadzone: None,
        })
    }

    pub fn with_deadzone(mut self, deadzone: Size) -> Self {
        self.deadzone = Some(deadzone);
        self
    }

    pub fn lerp_factor(&self) -> f64 {
        self.lerp_factor
    }

    pub fn deadzone(&self) -> Option<Size> {
        self.deadzone
    }

    /// New view center after `dt` seconds of following `target`.
    pub fn update(&self, current: Point, target: Point, dt: f64) -> Point {
        if let Some(zone) = self.deadzone {
            let dx = (target.x - current.x).abs();
            let dy = (target.y - current.y).abs();
            if dx <= zone.width as f64 / 2.0 && dy <= zone.height as f64 / 2.0 {
                return current;
            }
        }
        if self.lerp_factor >= 1.0 {
            return target;
        }

        let t = 1.0 - (1.0 - self.lerp_factor).powf(dt.max(0.0));
        Point::new(
            current.x + (target.x - current.x) * t,
            current.y + (target.y - current.y) * t,
        )
    }
}
