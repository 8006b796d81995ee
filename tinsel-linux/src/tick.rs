//! host stand-ins for the tick interrupt: sample-clocked inside the audio
//! callback, or wall-clocked on a thread when there is no output device

use color_eyre::Result;
use cpal::{FromSample, SizedSample};
use embedded_hal::digital::{ErrorType, OutputPin};
use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tinsel_core::{Interrupt, Shared, TickTimer, TICK_HZ, TICK_US};

/// peak level of the buzzer square wave
pub const AMPLITUDE: f32 = 0.2;

/// piezo stand-in
#[derive(Default)]
pub struct Speaker {
    high: bool,
}

impl Speaker {
    pub fn sample(&self) -> f32 {
        if self.high {
            AMPLITUDE
        } else {
            0.
        }
    }
}

impl ErrorType for Speaker {
    type Error = Infallible;
}

impl OutputPin for Speaker {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

/// ticks owed per output frame; each re-arm pays one off
pub struct SampleClock {
    ticks_per_frame: f64,
    owed: f64,
}

impl SampleClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            ticks_per_frame: TICK_HZ as f64 / sample_rate as f64,
            owed: 0.,
        }
    }

    fn frame(&mut self) {
        self.owed += self.ticks_per_frame;
    }

    fn due(&self) -> bool {
        self.owed >= 1.
    }
}

impl TickTimer for SampleClock {
    fn rearm(&mut self) {
        self.owed -= 1.;
    }
}

/// fill an interleaved buffer, running every tick that falls inside it
pub fn render<T>(
    tick: &mut Interrupt<Speaker, SampleClock>,
    shared: &Shared,
    buffer: &mut [T],
    channels: usize,
) where
    T: SizedSample + FromSample<f32>,
{
    for frame in buffer.chunks_mut(channels) {
        tick.timer_mut().frame();
        while tick.timer().due() {
            // speaker writes are infallible
            let _ = tick.on_tick(shared);
        }
        frame.fill(T::from_sample(tick.buzzer().sample()));
    }
}

/// counts ticks against the time since start
pub struct WallClock {
    start: Instant,
    ticks: u64,
}

impl WallClock {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            ticks: 0,
        }
    }

    fn due(&self) -> bool {
        self.ticks < self.start.elapsed().as_micros() as u64 / TICK_US as u64
    }
}

impl TickTimer for WallClock {
    fn rearm(&mut self) {
        self.ticks += 1;
    }
}

/// silent ticking thread; catches up in bursts after each sleep
pub fn spawn_ticker(shared: Arc<Shared>, stop: Arc<AtomicBool>) -> JoinHandle<Result<()>> {
    std::thread::spawn(move || {
        let mut tick = Interrupt::new(Speaker::default(), WallClock::new());
        while !stop.load(Ordering::Relaxed) {
            while tick.timer().due() {
                tick.on_tick(&shared)?;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinsel_core::Task;

    #[test]
    fn sample_clock_keeps_tick_rate() {
        let shared = Shared::new();
        let mut tick = Interrupt::new(Speaker::default(), SampleClock::new(48_000));
        let mut buffer = [0f32; 2 * 48_000];
        render(&mut tick, &shared, &mut buffer, 2);
        // one second of frames; float drift may leave the last tick owed
        let ticks = shared.lights_elapsed();
        assert!((19_999..=20_000).contains(&ticks), "{ticks}");
    }

    #[test]
    fn renders_square_wave() {
        let shared = Shared::new();
        shared.publish(Task {
            half_period: 10,
            active: 2000,
            silence: 100,
        });
        let mut tick = Interrupt::new(Speaker::default(), SampleClock::new(20_000));
        let mut buffer = [0f32; 200];
        render(&mut tick, &shared, &mut buffer, 2);
        // one tick per frame, both channels equal
        for frame in buffer.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        let highs = buffer.chunks(2).filter(|f| f[0] == AMPLITUDE).count();
        assert_eq!(highs, 50);
    }

    #[test]
    fn wall_clock_is_due_after_a_tick() {
        let mut clock = WallClock::new();
        std::thread::sleep(Duration::from_micros(2 * TICK_US as u64));
        assert!(clock.due());
        clock.ticks = u64::MAX;
        assert!(!clock.due());
    }
}
