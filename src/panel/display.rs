//! 7-segment display multiplexer
//!
//! One digit is lit per tick at a fixed scan rate, fast enough that all four
//! appear steady. The scan runs on its own thread (the interrupt stand-in)
//! so a stalled receive loop can never freeze the display. Sharing is
//! single-writer: the receive loop stores into the [`DisplayCell`], the scan
//! thread only loads.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::DISPLAY_DIGITS;
use crate::panel::driver::SegmentDriver;

/// Value currently shown on the display, shared with the receive loop
pub type DisplayCell = Arc<AtomicU16>;

/// Segment masks for '0'-'9' (bit 0 = A .. bit 6 = G, decimal point off)
const GLYPHS: [u8; 10] = [
    0b0011_1111, // 0
    0b0000_0110, // 1
    0b0101_1011, // 2
    0b0100_1111, // 3
    0b0110_0110, // 4
    0b0110_1101, // 5
    0b0111_1101, // 6
    0b0000_0111, // 7
    0b0111_1111, // 8
    0b0110_1111, // 9
];

pub const GLYPH_BLANK: u8 = 0b0000_0000;
pub const GLYPH_DASH: u8 = 0b0100_0000;

/// Segment mask for one decimal digit; out-of-range values render blank
pub fn glyph_for(digit: u8) -> u8 {
    GLYPHS.get(digit as usize).copied().unwrap_or(GLYPH_BLANK)
}

/// Decimal digit of `value` at `position` 0..4 (thousands down to units)
pub fn digit_at(value: u16, position: usize) -> u8 {
    let divisor = match position {
        0 => 1000,
        1 => 100,
        2 => 10,
        _ => 1,
    };
    ((value / divisor) % 10) as u8
}

/// Time-slices one digit per tick over the segment driver
pub struct DisplayMux<D: SegmentDriver> {
    driver: D,
    cell: DisplayCell,
    position: usize,
}

impl<D: SegmentDriver> DisplayMux<D> {
    pub fn new(driver: D, cell: DisplayCell) -> Self {
        Self {
            driver,
            cell,
            position: 0,
        }
    }

    /// One scan step: blank everything, drive the current digit's glyph,
    /// enable that digit, advance the position modulo the digit count.
    pub fn tick(&mut self) {
        self.driver.select_digit(None);
        self.driver.set_segments(GLYPH_BLANK);

        let value = self.cell.load(Ordering::Relaxed);
        let glyph = glyph_for(digit_at(value, self.position));

        self.driver.set_segments(glyph);
        self.driver.select_digit(Some(self.position));

        self.position = (self.position + 1) % DISPLAY_DIGITS;
    }
}

/// Running scan thread; stops on drop
pub struct DisplayMuxHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DisplayMuxHandle {
    /// Start scanning `cell` at `refresh_hz` ticks per second
    pub fn spawn<D>(driver: D, cell: DisplayCell, refresh_hz: u32) -> std::io::Result<Self>
    where
        D: SegmentDriver + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let period = Duration::from_secs_f64(1.0 / refresh_hz.max(1) as f64);

        let thread = thread::Builder::new()
            .name("display-mux".to_string())
            .spawn(move || {
                let mut mux = DisplayMux::new(driver, cell);
                while thread_running.load(Ordering::Relaxed) {
                    mux.tick();
                    thread::sleep(period);
                }
            })?;

        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DisplayMuxHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
