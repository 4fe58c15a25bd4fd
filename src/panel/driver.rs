//! Panel pin boundary
//!
//! Logic-level traits for the display and LED lines. Masks use positive
//! logic (bit set = lit); electrical polarity for a common-anode or
//! common-cathode wiring is the implementation's concern.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::panel::indicator::LedPattern;

/// Digit select sentinel: no digit enabled
const NO_DIGIT: u8 = u8::MAX;

/// Drives the shared segment lines and the per-digit enables
pub trait SegmentDriver {
    /// Set the segment lines. Bit 0 = A .. bit 6 = G, bit 7 = decimal point.
    fn set_segments(&self, mask: u8);

    /// Enable exactly one digit, or none
    fn select_digit(&self, digit: Option<usize>);
}

/// Drives the three volume indicator outputs
pub trait LedDriver {
    fn set_pattern(&self, pattern: LedPattern);
}

impl<T: SegmentDriver + ?Sized> SegmentDriver for std::sync::Arc<T> {
    fn set_segments(&self, mask: u8) {
        (**self).set_segments(mask);
    }

    fn select_digit(&self, digit: Option<usize>) {
        (**self).select_digit(digit);
    }
}

impl<T: LedDriver + ?Sized> LedDriver for std::sync::Arc<T> {
    fn set_pattern(&self, pattern: LedPattern) {
        (**self).set_pattern(pattern);
    }
}

/// In-memory panel for the desktop binaries and tests.
///
/// All state is atomic so the display thread and the receive loop can share
/// one instance behind an `Arc`.
#[derive(Default)]
pub struct SimPanel {
    segments: AtomicU8,
    digit: AtomicU8,
    leds: AtomicU8,
}

impl SimPanel {
    pub fn new() -> Self {
        Self {
            segments: AtomicU8::new(0),
            digit: AtomicU8::new(NO_DIGIT),
            leds: AtomicU8::new(0),
        }
    }

    pub fn segments(&self) -> u8 {
        self.segments.load(Ordering::Relaxed)
    }

    pub fn active_digit(&self) -> Option<usize> {
        match self.digit.load(Ordering::Relaxed) {
            NO_DIGIT => None,
            digit => Some(digit as usize),
        }
    }

    pub fn led_pattern(&self) -> LedPattern {
        let bits = self.leds.load(Ordering::Relaxed);
        LedPattern {
            led1: bits & 0b001 != 0,
            led2: bits & 0b010 != 0,
            led3: bits & 0b100 != 0,
        }
    }
}

impl SegmentDriver for SimPanel {
    fn set_segments(&self, mask: u8) {
        self.segments.store(mask, Ordering::Relaxed);
    }

    fn select_digit(&self, digit: Option<usize>) {
        let value = digit.map_or(NO_DIGIT, |d| d as u8);
        self.digit.store(value, Ordering::Relaxed);
    }
}

impl LedDriver for SimPanel {
    fn set_pattern(&self, pattern: LedPattern) {
        let bits = (pattern.led1 as u8) | ((pattern.led2 as u8) << 1) | ((pattern.led3 as u8) << 2);
        self.leds.store(bits, Ordering::Relaxed);
    }
}
