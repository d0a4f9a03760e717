//! Scheduling of animated tiles
//!
//! Tokens are kept in a min-heap ordered by their next deadline, so checking
//! for due animations costs O(1) when nothing is due and O(k log n) when k
//! tokens are. The tracker never touches pixels: it reports which positions
//! must show which image and leaves the redraw to the renderer.

use crate::animation::token::{AnimationFrame, AnimationToken};
use crate::core::constants::MIN_FRAME_DURATION_MS;
use crate::core::geo::TileCoord;
use crate::data::adapter::{MapDataAdapter, TileImage};
use crate::prelude::{HashMap, HashSet};
use crate::{MapError, Result};
use instant::Instant;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

/// A frame change that the buffer has to apply
#[derive(Debug, Clone)]
pub struct AnimationSwap {
    /// Every position showing the animation that changed
    pub positions: Arc<[TileCoord]>,
    pub image: TileImage,
    pub frame_index: usize,
}

/// Frame sequences are grouped by gid and duration of each frame
type SequenceKey = (Vec<(u32, Duration)>, bool);

#[derive(Debug)]
pub struct AnimationTracker {
    tokens: Vec<AnimationToken>,
    queue: BinaryHeap<Reverse<(Instant, usize)>>,
    owners: HashMap<TileCoord, usize>,
    paused_at: Option<Instant>,
    speed_multiplier: f64,
}

impl Default for AnimationTracker {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            queue: BinaryHeap::new(),
            owners: HashMap::default(),
            paused_at: None,
            speed_multiplier: 1.0,
        }
    }
}

impl AnimationTracker {
    /// Collects the animations of every visible layer of `data`.
    ///
    /// Positions whose frame sequences are identical share one token and
    /// therefore always change frame together.
    pub fn build(data: &dyn MapDataAdapter, now: Instant) -> Self {
        Self::build_tokens(data, now, 1.0)
    }

    /// Like `build`, with every token already playing at `multiplier`.
    ///
    /// The first deadlines are scaled as well, so a tracker rebuilt after a
    /// map reload keeps the pace of the one it replaces.
    pub fn build_with_speed(
        data: &dyn MapDataAdapter,
        now: Instant,
        multiplier: f64,
    ) -> Result<Self> {
        validate_speed(multiplier)?;
        Ok(Self::build_tokens(data, now, multiplier))
    }

    fn build_tokens(data: &dyn MapDataAdapter, now: Instant, multiplier: f64) -> Self {
        let visible: HashSet<usize> = data.visible_tile_layers().into_iter().collect();
        let mut groups: HashMap<SequenceKey, usize> = HashMap::default();
        let mut sequences: Vec<(Vec<TileCoord>, Vec<AnimationFrame>, bool)> = Vec::new();

        for animation in data.animations() {
            if animation.frames.is_empty() {
                log::warn!(
                    "skipping animation with no frames at {} positions",
                    animation.positions.len()
                );
                continue;
            }
            let positions: Vec<TileCoord> = animation
                .positions
                .into_iter()
                .filter(|coord| visible.contains(&coord.layer))
                .collect();
            if positions.is_empty() {
                continue;
            }

            let frames: Vec<AnimationFrame> = animation
                .frames
                .into_iter()
                .map(|frame| {
                    let mut duration = frame.duration;
                    if duration.is_zero() {
                        log::warn!(
                            "animation frame for gid {} has zero duration, using {} ms",
                            frame.gid,
                            MIN_FRAME_DURATION_MS
                        );
                        duration = Duration::from_millis(MIN_FRAME_DURATION_MS);
                    }
                    AnimationFrame::new(frame.gid, frame.image, duration)
                })
                .collect();

            let key: SequenceKey = (
                frames.iter().map(|f| (f.gid, f.duration)).collect(),
                animation.looping,
            );
            match groups.get(&key) {
                Some(&group) => sequences[group].0.extend(positions),
                None => {
                    groups.insert(key, sequences.len());
                    sequences.push((positions, frames, animation.looping));
                }
            }
        }

        let mut tracker = Self {
            speed_multiplier: multiplier,
            ..Self::default()
        };
        for (positions, frames, looping) in sequences {
            let index = tracker.tokens.len();
            let Ok(mut token) = AnimationToken::new(positions, frames, now, looping) else {
                continue;
            };
            if multiplier != 1.0 {
                token.set_speed_multiplier(multiplier);
                token.restart(now);
            }
            for coord in token.positions().iter() {
                tracker.owners.entry(*coord).or_insert(index);
            }
            tracker.queue.push(Reverse((token.next(), index)));
            tracker.tokens.push(token);
        }

        log::debug!(
            "tracking {} animation tokens over {} positions",
            tracker.tokens.len(),
            tracker.owners.len()
        );
        tracker
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[AnimationToken] {
        &self.tokens
    }

    /// Earliest pending frame change, if any animation is still running
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Image currently shown at `coord`, if it is animated
    pub fn current_image(&self, coord: TileCoord) -> Option<TileImage> {
        let index = *self.owners.get(&coord)?;
        self.tokens.get(index).map(|token| token.current().image.clone())
    }

    /// Advances every token whose deadline is at or before `now`.
    ///
    /// Each due token moves exactly one frame. The returned iterator is lazy;
    /// tokens it does not reach stay due for the next call. Nothing advances
    /// while paused.
    pub fn advance(&mut self, now: Instant) -> Swaps<'_> {
        Swaps { tracker: self, now }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Freezes every animation on its current frame
    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Continues from where `pause` stopped.
    ///
    /// Deadlines are pushed back by the paused span so each frame still gets
    /// its full duration.
    pub fn resume(&mut self, now: Instant) {
        let Some(paused_at) = self.paused_at.take() else {
            return;
        };
        let paused_for = now.saturating_duration_since(paused_at);
        let entries = std::mem::take(&mut self.queue).into_vec();
        for Reverse((_, index)) in entries {
            if let Some(token) = self.tokens.get_mut(index) {
                token.delay(paused_for);
                self.queue.push(Reverse((token.next(), index)));
            }
        }
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Scales the speed of every animation; 0.5 plays at half speed.
    ///
    /// Takes effect from each token's next frame change.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<()> {
        validate_speed(multiplier)?;
        self.speed_multiplier = multiplier;
        for token in &mut self.tokens {
            token.set_speed_multiplier(multiplier);
        }
        Ok(())
    }
}

fn validate_speed(multiplier: f64) -> Result<()> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(MapError::InvalidConfiguration(format!(
            "animation speed multiplier must be greater than zero, got {multiplier}"
        )));
    }
    Ok(())
}

/// Iterator over the frame changes due at one instant
pub struct Swaps<'a> {
    tracker: &'a mut AnimationTracker,
    now: Instant,
}

impl Iterator for Swaps<'_> {
    type Item = AnimationSwap;

    fn next(&mut self) -> Option<Self::Item> {
        if self.tracker.is_paused() {
            return None;
        }
        loop {
            let Reverse((deadline, index)) = *self.tracker.queue.peek()?;
            if deadline > self.now {
                return None;
            }
            self.tracker.queue.pop();

            let token = self.tracker.tokens.get_mut(index)?;
            let image = match token.advance(self.now) {
                Some(frame) => frame.image.clone(),
                // finished tokens leave the queue for good
                None => continue,
            };
            let swap = AnimationSwap {
                positions: token.positions().clone(),
                image,
                frame_index: token.index(),
            };
            self.tracker.queue.push(Reverse((token.next(), index)));
            return Some(swap);
        }
    }
}
