//! tick-driven buzzer playback and the main loop handoff

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use embedded_hal::digital::{OutputPin, PinState};

/// timing for one note, in ticks
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Task {
    /// ticks between output inversions; 0 is a rest
    pub half_period: u16,
    /// ticks of tone (or counted silence for a rest)
    pub active: u16,
    /// ticks of forced silence after the note
    pub silence: u16,
}

/// State visible to both the main loop and the tick interrupt.
///
/// Write ownership:
/// - the main loop writes the task fields, then `playing = true`
/// - the interrupt writes `playing = false` once post-note silence is over
/// - the interrupt increments the lights counter; the main loop resets it
pub struct Shared {
    playing: AtomicBool,
    half_period: AtomicU16,
    active: AtomicU16,
    silence: AtomicU16,
    lights_elapsed: AtomicU32,
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    pub const fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            half_period: AtomicU16::new(0),
            active: AtomicU16::new(0),
            silence: AtomicU16::new(0),
            lights_elapsed: AtomicU32::new(0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// hand a task to the interrupt; refused while one is still live
    pub fn publish(&self, task: Task) -> bool {
        if self.is_playing() {
            return false;
        }
        self.half_period.store(task.half_period, Ordering::Relaxed);
        self.active.store(task.active, Ordering::Relaxed);
        self.silence.store(task.silence, Ordering::Relaxed);
        self.playing.store(true, Ordering::Release);
        true
    }

    /// live task; only meaningful after observing `is_playing`
    pub fn task(&self) -> Task {
        Task {
            half_period: self.half_period.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            silence: self.silence.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn finish(&self) {
        self.playing.store(false, Ordering::Release);
    }

    pub fn lights_elapsed(&self) -> u32 {
        self.lights_elapsed.load(Ordering::Relaxed)
    }

    pub fn reset_lights(&self) {
        self.lights_elapsed.store(0, Ordering::Relaxed);
    }

    pub(crate) fn tick_lights(&self) {
        self.lights_elapsed.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    #[default]
    Idle,
    Active,
    PostSilence,
}

/// Interrupt-private buzzer state machine.
///
/// The task is latched when a tick first observes `playing`, so the counters
/// always start from zero for a new note.
#[derive(Default)]
pub struct Playback {
    phase: Phase,
    task: Task,
    elapsed: u32,
    silence: u32,
    oscillation: u32,
    level: bool,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// advance one tick; returns the buzzer level to drive
    pub fn tick(&mut self, shared: &Shared) -> bool {
        match self.phase {
            Phase::Idle => {
                if !shared.is_playing() {
                    self.level = false;
                    return false;
                }
                self.task = shared.task();
                self.elapsed = 0;
                self.silence = 0;
                self.oscillation = 0;
                self.level = false;
                self.phase = Phase::Active;
                self.tick_active()
            }
            Phase::Active => self.tick_active(),
            Phase::PostSilence => {
                self.level = false;
                self.silence += 1;
                if self.silence > self.task.silence as u32 {
                    self.silence = 0;
                    self.phase = Phase::Idle;
                    shared.finish();
                }
                false
            }
        }
    }

    fn tick_active(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed > self.task.active as u32 {
            self.elapsed = 0;
            self.oscillation = 0;
            self.level = false;
            self.phase = Phase::PostSilence;
            return false;
        }
        if self.task.half_period == 0 {
            // rest
            self.level = false;
            return false;
        }
        self.oscillation += 1;
        if self.oscillation >= self.task.half_period as u32 {
            self.level = !self.level;
            self.oscillation = 0;
        }
        self.level
    }
}

/// the fixed-period timer behind the interrupt
pub trait TickTimer {
    /// schedule/acknowledge the next tick; called exactly once per tick
    fn rearm(&mut self);
}

/// Everything the tick interrupt owns.
pub struct Interrupt<B, T> {
    playback: Playback,
    buzzer: B,
    timer: T,
}

impl<B: OutputPin, T: TickTimer> Interrupt<B, T> {
    pub fn new(buzzer: B, timer: T) -> Self {
        Self {
            playback: Playback::new(),
            buzzer,
            timer,
        }
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn buzzer(&self) -> &B {
        &self.buzzer
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// one tick; the timer is re-armed before any branch runs
    pub fn on_tick(&mut self, shared: &Shared) -> Result<(), B::Error> {
        self.timer.rearm();
        shared.tick_lights();
        let level = self.playback.tick(shared);
        self.buzzer.set_state(PinState::from(level))
    }
}
