//! Transport command boundary
//!
//! The streaming engine only consumes [`TransportCommand`] values; where they
//! come from (camera gestures, a console, buttons) is behind the
//! [`CommandSource`] trait. [`GestureMapper`] implements the hand-pose policy:
//! an external landmark detector reduces each frame to a [`HandPose`] and the
//! mapper derives at most one command per cooldown window.

use std::time::{Duration, Instant};

use crate::constants::GESTURE_COOLDOWN_SECS;

/// A discrete command for the sender's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    Next,
    Prev,
    StopFull,
    Volume(u8),
}

/// Anything that can feed commands into the engine
pub trait CommandSource {
    /// Return the next pending command, if any. Must not block.
    fn poll(&mut self) -> Option<TransportCommand>;
}

/// Per-tick hand geometry from the external landmark detector.
///
/// Finger predicates follow the detector's convention: a finger is "up" when
/// its tip is above its middle joint. The pinch distance is measured between
/// thumb tip and index tip in image pixels.
#[derive(Debug, Clone, Copy)]
pub struct HandPose {
    pub thumb_tucked: bool,
    pub thumb_extended: bool,
    pub index_up: bool,
    pub middle_up: bool,
    pub ring_up: bool,
    pub pinky_up: bool,
    pub pinch_distance_px: f32,
}

/// Linear map of `value` from `[in_min, in_max]` to `[out_min, out_max]`,
/// clamping the input to its range first.
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: i32, out_max: i32) -> i32 {
    let value = value.clamp(in_min, in_max);
    if (in_max - in_min).abs() < f32::EPSILON {
        return out_min;
    }
    ((value - in_min) * (out_max - out_min) as f32 / (in_max - in_min) + out_min as f32) as i32
}

/// Pinch distance corresponding to volume 0
const PINCH_MIN_PX: f32 = 20.0;
/// Pinch distance corresponding to volume 100
const PINCH_MAX_PX: f32 = 220.0;
/// Volume deltas at or below this are ignored, except at the rails
const VOLUME_HYSTERESIS: i32 = 2;

/// Derives transport commands from hand poses with per-class cooldowns
pub struct GestureMapper {
    cooldown: Duration,
    last_transport: Option<Instant>,
    last_volume: Option<Instant>,
    volume_level: u8,
}

impl GestureMapper {
    pub fn new(initial_volume: u8) -> Self {
        Self {
            cooldown: Duration::from_secs_f32(GESTURE_COOLDOWN_SECS),
            last_transport: None,
            last_volume: None,
            volume_level: initial_volume.min(100),
        }
    }

    /// Last volume level derived from a pinch gesture
    pub fn volume_level(&self) -> u8 {
        self.volume_level
    }

    /// Classify one pose. Returns at most one command; poses that map to a
    /// transport command and the pinch pose are mutually exclusive.
    pub fn classify(&mut self, pose: &HandPose, now: Instant) -> Option<TransportCommand> {
        if self.transport_ready(now) {
            if let Some(command) = Self::transport_gesture(pose) {
                self.last_transport = Some(now);
                return Some(command);
            }
        }

        if self.volume_ready(now) && Self::is_pinch_pose(pose) {
            let new_level =
                map_range(pose.pinch_distance_px, PINCH_MIN_PX, PINCH_MAX_PX, 0, 100) as u8;
            let delta = (new_level as i32 - self.volume_level as i32).abs();
            if delta > VOLUME_HYSTERESIS || new_level == 0 || new_level == 100 {
                self.volume_level = new_level;
                self.last_volume = Some(now);
                return Some(TransportCommand::Volume(new_level));
            }
        }

        None
    }

    fn transport_gesture(pose: &HandPose) -> Option<TransportCommand> {
        let HandPose {
            thumb_tucked,
            thumb_extended,
            index_up,
            middle_up,
            ring_up,
            pinky_up,
            ..
        } = *pose;

        // open palm
        if thumb_extended && index_up && middle_up && ring_up && pinky_up {
            return Some(TransportCommand::Play);
        }
        // closed fist
        if !index_up && !middle_up && !ring_up && !pinky_up && thumb_tucked {
            return Some(TransportCommand::Pause);
        }
        // index + middle
        if index_up && middle_up && !ring_up && !pinky_up && thumb_tucked {
            return Some(TransportCommand::Next);
        }
        // index + pinky
        if index_up && !middle_up && !ring_up && pinky_up && thumb_tucked {
            return Some(TransportCommand::Prev);
        }
        None
    }

    fn is_pinch_pose(pose: &HandPose) -> bool {
        pose.thumb_extended && pose.index_up && !pose.middle_up && !pose.ring_up && !pose.pinky_up
    }

    fn transport_ready(&self, now: Instant) -> bool {
        self.last_transport
            .map_or(true, |last| now.duration_since(last) > self.cooldown)
    }

    fn volume_ready(&self, now: Instant) -> bool {
        self.last_volume
            .map_or(true, |last| now.duration_since(last) > self.cooldown)
    }
}
