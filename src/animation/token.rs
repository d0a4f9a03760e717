use crate::core::constants::{MAX_FRAME_DURATION_MS, MIN_FRAME_DURATION_MS};
use crate::core::geo::TileCoord;
use crate::data::adapter::TileImage;
use crate::{MapError, Result};
use instant::Instant;
use std::sync::Arc;
use std::time::Duration;

/// A single frame of an animation: what to show and for how long
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    pub gid: u32,
    pub image: TileImage,
    pub duration: Duration,
}

impl AnimationFrame {
    pub fn new(gid: u32, image: TileImage, duration: Duration) -> Self {
        Self {
            gid,
            image,
            duration,
        }
    }
}

/// Playback state of one animation, shared by every tile position that shows it
#[derive(Debug, Clone)]
pub struct AnimationToken {
    positions: Arc<[TileCoord]>,
    frames: Vec<AnimationFrame>,
    index: usize,
    next: Instant,
    looping: bool,
    done: bool,
    speed_multiplier: f64,
}

impl AnimationToken {
    /// Creates a token showing its first frame, due to change at
    /// `now + frames[0].duration`.
    pub fn new(
        positions: Vec<TileCoord>,
        frames: Vec<AnimationFrame>,
        now: Instant,
        looping: bool,
    ) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(MapError::InvalidConfiguration(
                "an animation needs at least one frame".to_string(),
            ));
        };
        let next = now + scaled_delay(first.duration, 1.0);
        Ok(Self {
            positions: positions.into(),
            frames,
            index: 0,
            next,
            looping,
            done: false,
            speed_multiplier: 1.0,
        })
    }

    pub fn positions(&self) -> &Arc<[TileCoord]> {
        &self.positions
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// When the next frame is due
    pub fn next(&self) -> Instant {
        self.next
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// A non-looping animation that has shown its last frame
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn current(&self) -> &AnimationFrame {
        &self.frames[self.index]
    }

    /// Takes effect from the next frame change; see `restart` to apply it
    /// to the current frame too.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) {
        self.speed_multiplier = multiplier;
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Reschedules the current frame as if it had just been shown at `now`
    pub(crate) fn restart(&mut self, now: Instant) {
        self.next = now + scaled_delay(self.current().duration, self.speed_multiplier);
    }

    /// Moves to the next frame and schedules the one after it.
    ///
    /// Returns `None` when nothing changed: the token is done, or a
    /// non-looping token was on its last frame and has now finished.
    pub fn advance(&mut self, now: Instant) -> Option<&AnimationFrame> {
        if self.done {
            return None;
        }
        if self.index + 1 == self.frames.len() {
            if !self.looping {
                self.done = true;
                return None;
            }
            self.index = 0;
        } else {
            self.index += 1;
        }

        self.next = now + scaled_delay(self.frames[self.index].duration, self.speed_multiplier);
        Some(&self.frames[self.index])
    }

    /// Shifts the deadline, used when resuming from a pause
    pub(crate) fn delay(&mut self, by: Duration) {
        self.next += by;
    }
}

/// Frame duration divided by `speed`, kept within
/// `MIN_FRAME_DURATION_MS..=MAX_FRAME_DURATION_MS`.
fn scaled_delay(duration: Duration, speed: f64) -> Duration {
    let min = Duration::from_millis(MIN_FRAME_DURATION_MS);
    let max = Duration::from_millis(MAX_FRAME_DURATION_MS);
    Duration::try_from_secs_f64(duration.as_secs_f64() / speed)
        .unwrap_or(max)
        .clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn frame(gid: u32, ms: u64) -> AnimationFrame {
        let image = Arc::new(RgbaImage::from_pixel(1, 1, Rgba([gid as u8, 0, 0, 255])));
        AnimationFrame::new(gid, image, Duration::from_millis(ms))
    }

    #[test]
    fn test_looping_wraps() {
        let start = Instant::now();
        let mut token =
            AnimationToken::new(vec![], vec![frame(1, 100), frame(2, 200)], start, true).unwrap();
        assert_eq!(token.next(), start + Duration::from_millis(100));

        let now = start + Duration::from_millis(100);
        assert_eq!(token.advance(now).map(|f| f.gid), Some(2));
        assert_eq!(token.next(), now + Duration::from_millis(200));
        assert_eq!(token.advance(now).map(|f| f.gid), Some(1));
        assert_eq!(token.index(), 0);
    }

    #[test]
    fn test_once_stops_on_last_frame() {
        let start = Instant::now();
        let mut token =
            AnimationToken::new(vec![], vec![frame(1, 10), frame(2, 10)], start, false).unwrap();
        assert!(token.advance(start).is_some());
        assert!(token.advance(start).is_none());
        assert!(token.is_done());
        assert_eq!(token.current().gid, 2);
    }

    #[test]
    fn test_speed_multiplier_scales_deadline() {
        let start = Instant::now();
        let mut token =
            AnimationToken::new(vec![], vec![frame(1, 100), frame(2, 100)], start, true).unwrap();
        token.set_speed_multiplier(2.0);
        token.advance(start);
        assert_eq!(token.next(), start + Duration::from_millis(50));
    }

    #[test]
    fn test_tiny_speed_caps_the_delay() {
        let start = Instant::now();
        let mut token =
            AnimationToken::new(vec![], vec![frame(1, 100), frame(2, 100)], start, true).unwrap();
        token.set_speed_multiplier(1e-30);
        assert!(token.advance(start).is_some());
        assert_eq!(token.next(), start + Duration::from_millis(MAX_FRAME_DURATION_MS));

        token.set_speed_multiplier(f64::MIN_POSITIVE);
        assert!(token.advance(start).is_some());
        assert_eq!(token.next(), start + Duration::from_millis(MAX_FRAME_DURATION_MS));
    }

    #[test]
    fn test_huge_speed_keeps_minimum_delay() {
        let start = Instant::now();
        let mut token =
            AnimationToken::new(vec![], vec![frame(1, 100), frame(2, 100)], start, true).unwrap();
        token.set_speed_multiplier(1e30);
        token.advance(start);
        assert_eq!(token.next(), start + Duration::from_millis(MIN_FRAME_DURATION_MS));
    }

    #[test]
    fn test_restart_applies_speed_to_current_frame() {
        let start = Instant::now();
        let mut token =
            AnimationToken::new(vec![], vec![frame(1, 100), frame(2, 100)], start, true).unwrap();
        token.set_speed_multiplier(2.0);
        token.restart(start);
        assert_eq!(token.index(), 0);
        assert_eq!(token.next(), start + Duration::from_millis(50));
    }

    #[test]
    fn test_empty_frames_rejected() {
        assert!(AnimationToken::new(vec![], vec![], Instant::now(), true).is_err());
    }
}
