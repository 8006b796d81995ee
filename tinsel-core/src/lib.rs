#![no_std]

mod device;
mod lights;
mod playback;
mod rand;
mod tone;

pub use device::{Device, Poll};
pub use lights::{Advance, LedBank, LightSequencer, Lights, Pattern, Step, PATTERNS};
pub use playback::{Interrupt, Phase, Playback, Shared, Task, TickTimer};
pub use rand::Xorshift32;
pub use tone::{Dispatch, Melody, Note, ToneScheduler, MELODIES};

/// tick period in microseconds
pub const TICK_US: u32 = 50;
/// in hz
pub const TICK_HZ: u32 = 1_000_000 / TICK_US;

/// ticks per pattern step duration unit
pub const LIGHT_TICKS_PER_UNIT: u32 = 2000;
/// note table microseconds to half-period ticks
pub const HALF_PERIOD_DIVISOR: u16 = 50;
/// (duration unit * beat) to active ticks
pub const DURATION_SCALE: u16 = 20;
/// beat to post-note silence ticks
pub const SILENCE_SCALE: u16 = 10;

pub const DEFAULT_SEED: u32 = 7;
pub const STARTUP_DELAY_MS: u64 = 2000;

/// led output lines A..I
pub const LINE_COUNT: usize = 9;

/// SysTick reload value for one tick every [`TICK_US`] at the given core clock
pub const fn systick_reload(core_hz: u32) -> u32 {
    core_hz / TICK_HZ - 1
}
